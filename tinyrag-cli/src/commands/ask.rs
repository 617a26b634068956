use std::io::Write;

use crate::app::App;
use crate::commands::render_stream;

/// Run the `tinyrag ask` command.
pub async fn run_ask(app: &App, question: &str, stream: bool, out: &mut impl Write) -> anyhow::Result<()> {
    let request = app.request(question);
    if stream {
        let updates = app.pipeline().answer_stream(request).await?;
        render_stream(updates, out).await?;
    } else {
        let answer = app.pipeline().answer(request).await?;
        writeln!(out, "{}", answer.response)?;
    }
    Ok(())
}
