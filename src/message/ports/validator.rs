//! Validator port for canonical parts.

use crate::message::{domain::Part, error::ValidationError};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Port for part validation.
///
/// Normalizers delegate every produced part to a validator; a single
/// failure rejects the whole message.
///
/// # Implementation Notes
///
/// Implementations should:
/// - Collect all validation errors before returning (not fail-fast)
/// - Use `ValidationError::multiple` to combine errors
/// - Be stateless and thread-safe
pub trait PartValidator: Send + Sync {
    /// Validates one part at position `index`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` naming the index and the offending field.
    fn validate_part(&self, index: usize, part: &Part) -> ValidationResult<()>;

    /// Validates an ordered part list.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the list is empty, too long, or any part
    /// is invalid. Multiple failures are combined using
    /// `ValidationError::Multiple`.
    fn validate_parts(&self, parts: &[Part]) -> ValidationResult<()>;
}

/// Configuration for validation rules.
///
/// # Examples
///
/// ```
/// use colloquy::message::ports::validator::ValidationConfig;
///
/// let config = ValidationConfig::default();
/// assert_eq!(config.max_parts, 100);
///
/// let strict = ValidationConfig::strict();
/// assert!(strict.max_parts < config.max_parts);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Maximum number of parts per message.
    pub max_parts: usize,
    /// Maximum text length in characters.
    pub max_text_length: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_parts: 100,
            max_text_length: 100_000,
        }
    }
}

impl ValidationConfig {
    /// Creates a lenient configuration with raised limits.
    #[must_use]
    pub const fn lenient() -> Self {
        Self {
            max_parts: 1_000,
            max_text_length: 1_000_000,
        }
    }

    /// Creates a strict configuration with reduced limits.
    ///
    /// Useful for resource-constrained environments.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            max_parts: 20,
            max_text_length: 10_000,
        }
    }
}
