//! Prompt template handling for the text improver.
//!
//! Templates are plain strings containing the [`TEXT_PLACEHOLDER`] marker;
//! rendering substitutes the raw transcript into the marker.

use thiserror::Error;

/// Marker substituted with the raw transcript when a template is rendered.
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Default instruction sent to the LLM when the configuration does not
/// override it.
pub const DEFAULT_TEMPLATE: &str = "Fix any grammar, spelling, and punctuation errors in the \
     following transcribed speech. Preserve the original meaning and tone. \
     Return only the corrected text with no commentary:\n\n{text}";

/// Returned when a template string lacks the placeholder.
#[derive(Debug, Error)]
#[error("prompt template must contain the {TEXT_PLACEHOLDER} placeholder")]
pub struct TemplateError;

// ---------------------------------------------------------------------------
// PromptTemplate
// ---------------------------------------------------------------------------

/// A validated prompt template.
///
/// # Example
///
/// ```rust
/// use speaktype::improve::prompt::PromptTemplate;
///
/// let template = PromptTemplate::new("Clean up: {text}").unwrap();
/// assert_eq!(template.render("helo world"), "Clean up: helo world");
/// ```
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Validate and wrap a template string.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] if `template` does not contain
    /// [`TEXT_PLACEHOLDER`].
    pub fn new(template: impl Into<String>) -> Result<Self, TemplateError> {
        let template = template.into();
        if !template.contains(TEXT_PLACEHOLDER) {
            return Err(TemplateError);
        }
        Ok(Self { template })
    }

    /// The built-in correction prompt.
    pub fn default_template() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }

    /// Substitute `text` into the placeholder.
    pub fn render(&self, text: &str) -> String {
        self.template.replace(TEXT_PLACEHOLDER, text)
    }

    /// The raw template string.
    pub fn as_str(&self) -> &str {
        &self.template
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::default_template()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_placeholder() {
        let t = PromptTemplate::new("Improve: {text}!").unwrap();
        assert_eq!(t.render("hi there"), "Improve: hi there!");
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        assert!(PromptTemplate::new("no placeholder here").is_err());
    }

    #[test]
    fn default_template_contains_placeholder() {
        assert!(DEFAULT_TEMPLATE.contains(TEXT_PLACEHOLDER));
        let t = PromptTemplate::default();
        let rendered = t.render("sample text");
        assert!(rendered.contains("sample text"));
        assert!(!rendered.contains(TEXT_PLACEHOLDER));
    }

    #[test]
    fn render_preserves_braces_in_input_text() {
        let t = PromptTemplate::new("{text}").unwrap();
        assert_eq!(t.render("a {weird} input"), "a {weird} input");
    }
}
