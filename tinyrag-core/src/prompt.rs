//! Grounded prompt assembly and response composition.

use crate::locale::{DOCUMENTS_PLACEHOLDER, QUERY_PLACEHOLDER};

/// Render documents as a bulleted list, one `- <trimmed content>` per line.
pub fn format_documents<S: AsRef<str>>(documents: &[S]) -> String {
    documents.iter().map(|d| format!("- {}", d.as_ref().trim())).collect::<Vec<_>>().join("\n")
}

/// Interpolate the bulleted `documents` and the raw `query` into `template`.
///
/// Placeholders are substituted in a single left-to-right pass, so a
/// `{query}` or `{documents}` appearing inside a document or the query is
/// left as literal text.
pub fn build_prompt<S: AsRef<str>>(template: &str, documents: &[S], query: &str) -> String {
    let documents = format_documents(documents);
    let mut prompt = String::with_capacity(template.len() + documents.len() + query.len());
    let mut rest = template;

    loop {
        let next_documents = rest.find(DOCUMENTS_PLACEHOLDER);
        let next_query = rest.find(QUERY_PLACEHOLDER);
        let (pos, placeholder, value) = match (next_documents, next_query) {
            (Some(d), Some(q)) if d < q => (d, DOCUMENTS_PLACEHOLDER, documents.as_str()),
            (_, Some(q)) => (q, QUERY_PLACEHOLDER, query),
            (Some(d), None) => (d, DOCUMENTS_PLACEHOLDER, documents.as_str()),
            (None, None) => break,
        };
        prompt.push_str(&rest[..pos]);
        prompt.push_str(value);
        rest = &rest[pos + placeholder.len()..];
    }

    prompt.push_str(rest);
    prompt
}

/// Append the cited sources block after a generated answer.
pub fn compose_response<S: AsRef<str>>(answer: &str, heading: &str, sources: &[S]) -> String {
    format!("{answer}\n\n{heading}\n{}", format_documents(sources))
}
