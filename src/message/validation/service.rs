//! Validation service implementation.
//!
//! Provides the default implementation of the `PartValidator` port,
//! combining individual rules into a validator that reports every failure.

use crate::message::{
    domain::Part,
    error::ValidationError,
    ports::validator::{PartValidator, ValidationConfig, ValidationResult},
    validation::rules,
};

/// Default implementation of the part validator.
///
/// Applies all rules, collecting errors to provide comprehensive feedback
/// rather than failing on the first error.
///
/// # Examples
///
/// ```
/// use colloquy::message::domain::{Part, PartType};
/// use colloquy::message::ports::validator::PartValidator;
/// use colloquy::message::validation::DefaultPartValidator;
///
/// let validator = DefaultPartValidator::new();
/// assert!(validator.validate_parts(&[Part::text("Hello")]).is_ok());
/// assert!(validator.validate_parts(&[Part::new(PartType::Image)]).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DefaultPartValidator {
    config: ValidationConfig,
}

impl DefaultPartValidator {
    /// Creates a new validator with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new validator with custom configuration.
    #[must_use]
    pub const fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Returns the current validation configuration.
    #[must_use]
    pub const fn config(&self) -> &ValidationConfig {
        &self.config
    }
}

impl PartValidator for DefaultPartValidator {
    fn validate_part(&self, index: usize, part: &Part) -> ValidationResult<()> {
        rules::validate_part(index, part, &self.config)
    }

    fn validate_parts(&self, parts: &[Part]) -> ValidationResult<()> {
        rules::validate_part_count(parts, &self.config)?;

        let errors: Vec<ValidationError> = parts
            .iter()
            .enumerate()
            .filter_map(|(index, part)| self.validate_part(index, part).err())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::multiple(errors))
        }
    }
}
