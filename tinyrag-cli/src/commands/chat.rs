use std::io::Write;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tinyrag_core::{Answer, Message};
use tracing::{debug, error};

use crate::app::App;
use crate::commands::render_stream;

const PROMPT: &str = "you> ";

/// Conversation state of one chat session.
///
/// The pipeline never touches the history; after every answered turn the
/// raw question and the composed response are appended here.
#[derive(Debug, Default)]
pub struct ChatSession {
    history: Vec<Message>,
}

impl ChatSession {
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn record(&mut self, question: &str, answer: &Answer) {
        self.history.push(Message::user(question));
        self.history.push(Message::assistant(answer.response.clone()));
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

/// What the REPL should do with one input line.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Skip,
    Quit,
    Reset,
    Question(&'a str),
}

fn classify(line: &str) -> Input<'_> {
    match line.trim() {
        "" => Input::Skip,
        "/quit" | "/exit" => Input::Quit,
        "/reset" => Input::Reset,
        question => Input::Question(question),
    }
}

/// Run the `tinyrag chat` command.
pub async fn run_chat(app: &App, stream: bool, out: &mut impl Write) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut session = ChatSession::default();

    writeln!(out, "Ask a question. /reset clears the conversation, /quit exits.")?;
    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let question = match classify(&line) {
            Input::Skip => continue,
            Input::Quit => break,
            Input::Reset => {
                session.reset();
                writeln!(out, "Conversation cleared.")?;
                continue;
            }
            Input::Question(question) => question,
        };
        if let Err(e) = editor.add_history_entry(question) {
            debug!(error = %e, "failed to record line history");
        }

        match answer_turn(app, &session, question, stream, out).await {
            Ok(answer) => session.record(question, &answer),
            Err(e) => {
                error!(error = %e, "failed to answer question");
                writeln!(out, "error: {e:#}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

async fn answer_turn(
    app: &App,
    session: &ChatSession,
    question: &str,
    stream: bool,
    out: &mut impl Write,
) -> anyhow::Result<Answer> {
    let request = app.request(question).with_history(session.history());
    if stream {
        let updates = app.pipeline().answer_stream(request).await?;
        render_stream(updates, out).await
    } else {
        let answer = app.pipeline().answer(request).await?;
        writeln!(out, "{}", answer.response)?;
        Ok(answer)
    }
}
