//! Design requests and the normalized results of text/image stages

use gemforge_core::{Result, ServiceError};
use serde::{Deserialize, Serialize};

/// Constraint appended to every combined prompt
pub const BACKGROUND_CONSTRAINT: &str = "the image must have a white background";

/// What the user asked for: a free-form prompt plus selected styles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignRequest {
    pub raw_prompt: String,
    /// Styles in the order the user picked them
    #[serde(default)]
    pub styles: Vec<String>,
}

impl DesignRequest {
    pub fn new(raw_prompt: impl Into<String>, styles: Vec<String>) -> Self {
        Self {
            raw_prompt: raw_prompt.into(),
            styles,
        }
    }

    /// Build the prompt sent to the text-generation provider.
    ///
    /// Pure: the same request always yields the same string. Styles are
    /// comma-joined and lower-cased. An empty raw prompt is allowed and
    /// leaves only the constraint and styles clause.
    pub fn combined_prompt(&self) -> String {
        format!(
            "{} {} and the styles should include {}",
            self.raw_prompt,
            BACKGROUND_CONSTRAINT,
            self.styles.join(", ").to_lowercase()
        )
    }
}

/// Successful output of the text or image stage.
///
/// Constructors refuse empty payloads, so a value of this type is always usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResult {
    /// Expanded prompt text
    Text(String),
    /// URL or path of a rendered image
    Locator(String),
}

impl GenerationResult {
    pub fn text(value: &str) -> Result<Self> {
        non_empty(value, "text").map(GenerationResult::Text)
    }

    pub fn locator(value: &str) -> Result<Self> {
        non_empty(value, "image locator").map(GenerationResult::Locator)
    }

    pub fn into_inner(self) -> String {
        match self {
            GenerationResult::Text(s) | GenerationResult::Locator(s) => s,
        }
    }
}

fn non_empty(value: &str, what: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(ServiceError::malformed(format!("provider returned an empty {}", what)).into());
    }
    Ok(value.to_string())
}

/// Pick the explicit override when it has content, else the upstream value.
pub fn resolve_override<'a>(explicit: Option<&'a str>, upstream: Option<&'a str>) -> Option<&'a str> {
    match explicit {
        Some(value) if !value.trim().is_empty() => Some(value),
        _ => upstream,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemforge_core::{GemforgeError, ServiceErrorKind};

    #[test]
    fn test_combined_prompt_example() {
        let request = DesignRequest::new(
            "a ring with a ruby",
            vec!["Modern".to_string(), "Minimalist".to_string()],
        );
        assert_eq!(
            request.combined_prompt(),
            "a ring with a ruby the image must have a white background and the styles should include modern, minimalist"
        );
    }

    #[test]
    fn test_combined_prompt_is_deterministic() {
        let request = DesignRequest::new("pendant", vec!["Art Deco".into(), "GOTHIC".into()]);
        let first = request.combined_prompt();
        assert_eq!(first, request.combined_prompt());
        assert!(first.ends_with("art deco, gothic"));
        assert!(!first.contains("GOTHIC"));
    }

    #[test]
    fn test_combined_prompt_empty_inputs() {
        let request = DesignRequest::new("", vec![]);
        assert_eq!(
            request.combined_prompt(),
            " the image must have a white background and the styles should include "
        );
    }

    #[test]
    fn test_style_order_preserved() {
        let a = DesignRequest::new("x", vec!["Retro".into(), "Sporty".into()]);
        let b = DesignRequest::new("x", vec!["Sporty".into(), "Retro".into()]);
        assert_ne!(a.combined_prompt(), b.combined_prompt());
    }

    #[test]
    fn test_generation_result_rejects_empty() {
        let err = GenerationResult::text("   ").unwrap_err();
        assert!(matches!(
            err,
            GemforgeError::Service(ref e) if e.kind == ServiceErrorKind::MalformedResponse
        ));
        assert!(GenerationResult::locator("").is_err());
        assert_eq!(
            GenerationResult::locator("https://example/img.png").unwrap().into_inner(),
            "https://example/img.png"
        );
    }

    #[test]
    fn test_generation_result_keeps_provider_text() {
        let text = "  A rose-gold band,\nengraved.\n";
        assert_eq!(GenerationResult::text(text).unwrap().into_inner(), text);
    }

    #[test]
    fn test_resolve_override() {
        assert_eq!(resolve_override(Some("manual"), Some("generated")), Some("manual"));
        assert_eq!(resolve_override(Some("  "), Some("generated")), Some("generated"));
        assert_eq!(resolve_override(None, Some("generated")), Some("generated"));
        assert_eq!(resolve_override(None, None), None);
        assert_eq!(resolve_override(Some(""), None), None);
    }
}
