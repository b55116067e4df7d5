//! Wire format selector.

use crate::message::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// External message shape a client speaks.
///
/// # Examples
///
/// ```
/// use colloquy::message::domain::MessageFormat;
///
/// assert_eq!(MessageFormat::resolve(None).expect("default"), MessageFormat::OpenAi);
/// assert_eq!(
///     MessageFormat::resolve(Some("anthropic")).expect("known"),
///     MessageFormat::Anthropic,
/// );
/// assert!(MessageFormat::resolve(Some("OpenAI")).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MessageFormat {
    /// The internal part model, verbatim.
    #[serde(rename = "canonical", alias = "acontext")]
    Canonical,
    /// OpenAI chat-completion messages.
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    /// Anthropic messages.
    #[serde(rename = "anthropic")]
    Anthropic,
}

impl MessageFormat {
    /// All supported formats.
    pub const ALL: [Self; 3] = [Self::Canonical, Self::OpenAi, Self::Anthropic];

    /// Older selector accepted for [`MessageFormat::Canonical`].
    pub const CANONICAL_ALIAS: &str = "acontext";

    /// Returns the selector string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Canonical => "canonical",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }

    /// Resolves an optional selector, defaulting to [`MessageFormat::OpenAi`].
    ///
    /// Selectors are case-sensitive; an empty selector counts as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnsupportedFormat`] for unknown selectors.
    pub fn resolve(selector: Option<&str>) -> Result<Self, ValidationError> {
        match selector {
            None | Some("") => Ok(Self::default()),
            Some(value) => value.parse(),
        }
    }
}

impl fmt::Display for MessageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageFormat {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == Self::CANONICAL_ALIAS {
            return Ok(Self::Canonical);
        }
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == value)
            .ok_or_else(|| ValidationError::UnsupportedFormat(value.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::absent(None, MessageFormat::OpenAi)]
    #[case::empty(Some(""), MessageFormat::OpenAi)]
    #[case::canonical(Some("canonical"), MessageFormat::Canonical)]
    #[case::canonical_alias(Some("acontext"), MessageFormat::Canonical)]
    #[case::openai(Some("openai"), MessageFormat::OpenAi)]
    #[case::anthropic(Some("anthropic"), MessageFormat::Anthropic)]
    fn selectors_resolve(#[case] selector: Option<&str>, #[case] expected: MessageFormat) {
        assert_eq!(MessageFormat::resolve(selector), Ok(expected));
    }

    #[rstest]
    #[case("Acontext")]
    #[case("OpenAI")]
    #[case("gemini")]
    fn other_selectors_are_unsupported(#[case] selector: &str) {
        assert_eq!(
            MessageFormat::resolve(Some(selector)),
            Err(ValidationError::UnsupportedFormat(selector.to_owned()))
        );
    }

    #[rstest]
    fn the_alias_renders_as_canonical() {
        let format: MessageFormat = "acontext".parse().expect("alias parses");
        assert_eq!(format.to_string(), "canonical");
    }
}
