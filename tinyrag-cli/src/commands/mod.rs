pub mod ask;
pub mod chat;
pub mod ingest;

use std::io::Write;

use futures::StreamExt;
use tinyrag_core::{Answer, AnswerStream, AnswerUpdate};

/// Print a streamed answer as it grows and return the final result.
///
/// Each partial answer extends the previous one, so only the new suffix is
/// written. The references block is written once the answer is complete.
pub async fn render_stream(mut updates: AnswerStream, out: &mut impl Write) -> anyhow::Result<Answer> {
    let mut printed = 0;
    while let Some(update) = updates.next().await {
        match update? {
            AnswerUpdate::Partial(text) => {
                write!(out, "{}", text.get(printed..).unwrap_or_default())?;
                out.flush()?;
                printed = text.len();
            }
            AnswerUpdate::Complete(answer) => {
                writeln!(out, "{}", answer.response.get(printed..).unwrap_or_default())?;
                return Ok(answer);
            }
        }
    }
    anyhow::bail!("answer stream ended before the answer was complete")
}

#[cfg(test)]
mod tests {
    use futures::stream;
    use tinyrag_core::{AnswerOutcome, RagError};

    use super::*;

    fn answer(text: &str, response: &str) -> Answer {
        Answer {
            outcome: AnswerOutcome::Answered,
            language: "en".into(),
            text: text.into(),
            sources: vec!["doc".into()],
            response: response.into(),
        }
    }

    #[tokio::test]
    async fn partials_are_printed_once_then_references() {
        let updates: AnswerStream = Box::pin(stream::iter(vec![
            Ok(AnswerUpdate::Partial("Up to ".into())),
            Ok(AnswerUpdate::Partial("Up to three years.".into())),
            Ok(AnswerUpdate::Complete(answer(
                "Up to three years.",
                "Up to three years.\n\nReferences:\n- doc",
            ))),
        ]));
        let mut out = Vec::new();

        let final_answer = render_stream(updates, &mut out).await.unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "Up to three years.\n\nReferences:\n- doc\n");
        assert_eq!(final_answer.text, "Up to three years.");
    }

    #[tokio::test]
    async fn stream_errors_are_returned() {
        let updates: AnswerStream = Box::pin(stream::iter(vec![
            Ok(AnswerUpdate::Partial("Up".into())),
            Err(RagError::Generation { generator: "llm".into(), message: "reset".into() }),
        ]));
        let mut out = Vec::new();

        assert!(render_stream(updates, &mut out).await.is_err());
        assert_eq!(out, b"Up");
    }

    #[tokio::test]
    async fn stream_without_final_answer_is_an_error() {
        let updates: AnswerStream =
            Box::pin(stream::iter(vec![Ok(AnswerUpdate::Partial("Up".into()))]));
        assert!(render_stream(updates, &mut Vec::new()).await.is_err());
    }
}
