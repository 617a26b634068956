//! Localized prompt templates and user-facing messages.
//!
//! A [`Localizer`] maps language codes to a [`LocaleBundle`] holding the
//! grounded-answer prompt template and the fixed messages the pipeline
//! shows to users. Requests for an unregistered language silently use the
//! configured default language.

use std::collections::HashMap;

use tracing::warn;

use crate::error::{RagError, Result};

/// Placeholder replaced by the bulleted document list.
pub const DOCUMENTS_PLACEHOLDER: &str = "{documents}";
/// Placeholder replaced by the raw query text.
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// The fallback language of [`Localizer::default()`].
pub const DEFAULT_LANGUAGE: &str = "en";

const EN_TEMPLATE: &str = "
DOCUMENT:
{documents}

QUESTION: {query}

INSTRUCTIONS:
Answer the user's QUESTION using the DOCUMENT text above.
Keep your answer grounded in the facts of the DOCUMENT.
If the DOCUMENT doesn't contain the facts to answer the QUESTION, return \"I cannot find relevant information in the documents.\"
";

const TH_TEMPLATE: &str = "คำถาม: {query}
จงตอบคำถามกับกำกับมาตราที่อ้างอิงด้วยข้อมูลต่อไปนี้ ห้ามตอบนอกเหนือจากข้อมูล:
{documents}";

const JA_TEMPLATE: &str = "
Documents:
{documents}

Question: {query}

Instructions:
Use the documents above to answer the user's question.
Answer based on the facts in the documents.
If there is no relevant information in the documents, return \"No relevant information found in the documents.\"
";

/// Keys of the fixed user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// Shown instead of an answer when no document passes the relevance filter.
    NoResults,
    /// Heading of the cited sources block appended to every answer.
    ReferencesHeading,
}

/// Template and messages for one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleBundle {
    template: String,
    no_results: String,
    references_heading: String,
}

impl LocaleBundle {
    /// Create a bundle.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `template` lacks the `{documents}` or
    /// `{query}` placeholder.
    pub fn new(
        template: impl Into<String>,
        no_results: impl Into<String>,
        references_heading: impl Into<String>,
    ) -> Result<Self> {
        let template = template.into();
        for placeholder in [DOCUMENTS_PLACEHOLDER, QUERY_PLACEHOLDER] {
            if !template.contains(placeholder) {
                return Err(RagError::Config(format!(
                    "prompt template is missing the {placeholder} placeholder"
                )));
            }
        }
        Ok(Self {
            template,
            no_results: no_results.into(),
            references_heading: references_heading.into(),
        })
    }

    /// The prompt template, containing `{documents}` and `{query}`.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The message for `key`.
    pub fn message(&self, key: MessageKey) -> &str {
        match key {
            MessageKey::NoResults => &self.no_results,
            MessageKey::ReferencesHeading => &self.references_heading,
        }
    }

    fn builtin(template: &str, no_results: &str, references_heading: &str) -> Self {
        Self {
            template: template.to_string(),
            no_results: no_results.to_string(),
            references_heading: references_heading.to_string(),
        }
    }
}

/// Language-indexed lookup of templates and messages with a default fallback.
///
/// [`Localizer::default()`] provides English (`en`, the default), Thai
/// (`th`) and Japanese (`ja`).
///
/// # Example
///
/// ```rust,ignore
/// use tinyrag_core::{Localizer, MessageKey};
///
/// let localizer = Localizer::default();
/// // "fr" is not registered, so the English message is returned.
/// let msg = localizer.message(MessageKey::NoResults, "fr");
/// ```
#[derive(Debug, Clone)]
pub struct Localizer {
    default_language: String,
    fallback: LocaleBundle,
    bundles: HashMap<String, LocaleBundle>,
}

impl Default for Localizer {
    fn default() -> Self {
        let english = LocaleBundle::builtin(
            EN_TEMPLATE,
            "Sorry, I cannot answer this question from the database. No relevant documents found.",
            "References:",
        );
        let bundles = HashMap::from([
            ("en".to_string(), english.clone()),
            (
                "th".to_string(),
                LocaleBundle::builtin(
                    TH_TEMPLATE,
                    "ขออภัย ไม่สามารถตอบคำถามนี้จากฐานข้อมูลได้",
                    "ข้อมูลที่อ้างอิง:",
                ),
            ),
            (
                "ja".to_string(),
                LocaleBundle::builtin(
                    JA_TEMPLATE,
                    "I apologize. I cannot answer this question from the database.",
                    "参考資料:",
                ),
            ),
        ]);
        Self { default_language: DEFAULT_LANGUAGE.to_string(), fallback: english, bundles }
    }
}

impl Localizer {
    /// Start from the built-in languages.
    pub fn builder() -> LocalizerBuilder {
        LocalizerBuilder { localizer: Localizer::default() }
    }

    /// The configured default language code.
    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Whether `language` has its own bundle.
    pub fn supports(&self, language: &str) -> bool {
        self.bundles.contains_key(language)
    }

    /// Registered language codes, sorted.
    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.bundles.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }

    /// Resolve a requested language code to a registered one.
    ///
    /// Unknown or empty codes resolve to the default language.
    pub fn resolve<'a>(&'a self, language: &'a str) -> &'a str {
        if self.supports(language) {
            language
        } else {
            warn!(requested = language, fallback = %self.default_language, "unsupported language, using default");
            &self.default_language
        }
    }

    /// The bundle for `language`, falling back to the default language.
    pub fn bundle(&self, language: &str) -> &LocaleBundle {
        self.bundles.get(language).unwrap_or(&self.fallback)
    }

    /// The message for `key` in `language`, falling back to the default language.
    pub fn message(&self, key: MessageKey, language: &str) -> &str {
        self.bundle(language).message(key)
    }

    /// The prompt template for `language`, falling back to the default language.
    pub fn template(&self, language: &str) -> &str {
        self.bundle(language).template()
    }
}

/// Builder for a customized [`Localizer`].
#[derive(Debug, Clone)]
pub struct LocalizerBuilder {
    localizer: Localizer,
}

impl LocalizerBuilder {
    /// Register or replace the bundle for `language`.
    pub fn locale(mut self, language: impl Into<String>, bundle: LocaleBundle) -> Self {
        self.localizer.bundles.insert(language.into(), bundle);
        self
    }

    /// Set the fallback language.
    pub fn default_language(mut self, language: impl Into<String>) -> Self {
        self.localizer.default_language = language.into();
        self
    }

    /// Build the [`Localizer`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the default language has no bundle.
    pub fn build(mut self) -> Result<Localizer> {
        let Some(fallback) = self.localizer.bundles.get(&self.localizer.default_language) else {
            return Err(RagError::Config(format!(
                "default language '{}' is not supported (available: {})",
                self.localizer.default_language,
                self.localizer.languages().join(", ")
            )));
        };
        self.localizer.fallback = fallback.clone();
        Ok(self.localizer)
    }
}
