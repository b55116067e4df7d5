//! Individual validation rule implementations.
//!
//! Each rule is a pure function over one part. Rules return `Ok(())` on
//! success or a `ValidationError` naming the part index and field.

use crate::message::{
    domain::{Part, PartType, meta_keys},
    error::ValidationError,
    ports::validator::ValidationConfig,
};

/// Validates that the list has at least one part and no more than the limit.
///
/// # Errors
///
/// Returns `ValidationError::EmptyParts` or `ValidationError::TooManyParts`.
pub const fn validate_part_count(
    parts: &[Part],
    config: &ValidationConfig,
) -> Result<(), ValidationError> {
    if parts.is_empty() {
        return Err(ValidationError::EmptyParts);
    }
    if parts.len() > config.max_parts {
        return Err(ValidationError::TooManyParts {
            max: config.max_parts,
            actual: parts.len(),
        });
    }
    Ok(())
}

/// Validates a part against the rule for its type.
///
/// # Errors
///
/// Returns the first rule violation found for the part.
pub fn validate_part(
    index: usize,
    part: &Part,
    config: &ValidationConfig,
) -> Result<(), ValidationError> {
    match part.kind {
        PartType::Text => validate_text(index, part, config),
        PartType::ToolCall => validate_tool_call(index, part),
        PartType::ToolResult => validate_tool_result(index, part),
        PartType::Data => validate_data(index, part),
        PartType::Image | PartType::Audio | PartType::Video | PartType::File => {
            validate_media(index, part)
        }
    }
}

/// Text parts need a non-empty body within the length limit.
///
/// # Errors
///
/// Returns `MissingPartField` for an absent or empty body and `InvalidPart`
/// when the body is too long.
pub fn validate_text(
    index: usize,
    part: &Part,
    config: &ValidationConfig,
) -> Result<(), ValidationError> {
    let text = part
        .text
        .as_deref()
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ValidationError::missing_field(index, "text"))?;

    let length = text.chars().count();
    if length > config.max_text_length {
        return Err(ValidationError::invalid_part(
            index,
            format!(
                "text length {length} exceeds maximum of {}",
                config.max_text_length
            ),
        ));
    }
    Ok(())
}

/// Tool calls need a tool name and arguments under either synonymous key.
///
/// # Errors
///
/// Returns `MissingPartField` naming `meta`, `meta.name`, or
/// `meta.arguments`.
pub fn validate_tool_call(index: usize, part: &Part) -> Result<(), ValidationError> {
    require_meta(index, part)?;
    if part.meta_str(&meta_keys::TOOL_NAME_KEYS).is_none() {
        return Err(ValidationError::missing_field(index, "meta.name"));
    }
    if part.meta_value(&meta_keys::ARGUMENT_KEYS).is_none() {
        return Err(ValidationError::missing_field(index, "meta.arguments"));
    }
    Ok(())
}

/// Tool results need a correlating call identifier under either key.
///
/// # Errors
///
/// Returns `MissingPartField` naming `meta` or `meta.tool_call_id`.
pub fn validate_tool_result(index: usize, part: &Part) -> Result<(), ValidationError> {
    require_meta(index, part)?;
    if part.meta_str(&meta_keys::CALL_ID_KEYS).is_none() {
        return Err(ValidationError::missing_field(index, "meta.tool_call_id"));
    }
    Ok(())
}

/// Data parts need a `data_type` tag.
///
/// # Errors
///
/// Returns `MissingPartField` naming `meta` or `meta.data_type`.
pub fn validate_data(index: usize, part: &Part) -> Result<(), ValidationError> {
    require_meta(index, part)?;
    if part.meta_str(&[meta_keys::DATA_TYPE]).is_none() {
        return Err(ValidationError::missing_field(index, "meta.data_type"));
    }
    Ok(())
}

/// Media parts need a stored asset or a pending multipart field.
///
/// # Errors
///
/// Returns `MissingPartField` naming `file_field`.
pub fn validate_media(index: usize, part: &Part) -> Result<(), ValidationError> {
    let has_field = part
        .file_field
        .as_deref()
        .is_some_and(|field| !field.is_empty());
    if part.asset.is_none() && !has_field {
        return Err(ValidationError::missing_field(index, "file_field"));
    }
    Ok(())
}

const fn require_meta(index: usize, part: &Part) -> Result<(), ValidationError> {
    if part.meta.is_none() {
        return Err(ValidationError::missing_field(index, "meta"));
    }
    Ok(())
}
