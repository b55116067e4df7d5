//! Wire format codecs.
//!
//! Each supported [`MessageFormat`] has one codec that normalizes inbound
//! wire messages into canonical parts and renders stored messages back into
//! the wire shape. Codecs are selected through a [`CodecRegistry`] keyed on
//! the format.

mod anthropic;
mod blocks;
mod canonical;
mod openai;

pub use anthropic::AnthropicCodec;
pub use canonical::CanonicalCodec;
pub use openai::OpenAiCodec;

use crate::asset::domain::PublicUrl;
use crate::message::domain::{AttachedFiles, Message, MessageFormat, Part, Role};
use crate::message::error::ValidationError;
use crate::message::ports::validator::{PartValidator, ValidationResult};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Presigned URLs keyed by content hash.
pub type PublicUrls = HashMap<String, PublicUrl>;

/// An inbound message reduced to the canonical model.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMessage {
    /// Canonical role.
    pub role: Role,
    /// Ordered parts.
    pub parts: Vec<Part>,
    /// Message-level metadata.
    pub meta: Option<Map<String, Value>>,
    /// Payloads decoded from inline base64 blocks, keyed by generated field.
    pub inline_files: AttachedFiles,
}

impl NormalizedMessage {
    /// Creates a normalized message without metadata or inline payloads.
    #[must_use]
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self {
            role,
            parts,
            meta: None,
            inline_files: AttachedFiles::new(),
        }
    }

    /// Returns every multipart field the parts wait on.
    #[must_use]
    pub fn file_fields(&self) -> BTreeSet<&str> {
        self.parts
            .iter()
            .filter_map(|part| part.file_field.as_deref())
            .collect()
    }
}

/// Bidirectional translation between one wire format and canonical parts.
pub trait MessageCodec: Send + Sync {
    /// The format this codec speaks.
    fn format(&self) -> MessageFormat;

    /// Parses a wire message, enforcing the format's own structural rules.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` naming the offending block or field.
    fn parse_incoming(&self, body: &Value) -> ValidationResult<NormalizedMessage>;

    /// Renders a stored message in this format.
    ///
    /// Rendering never fails; part types without a native block use the
    /// generic data block.
    fn convert_outgoing(&self, message: &Message, urls: &PublicUrls) -> Value;

    /// Parses a wire message and validates every produced part.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` when parsing fails, no part is produced, or
    /// any part is invalid.
    fn normalize_incoming(
        &self,
        body: &Value,
        validator: &dyn PartValidator,
    ) -> ValidationResult<NormalizedMessage> {
        let normalized = self.parse_incoming(body)?;
        if normalized.parts.is_empty() {
            return Err(ValidationError::EmptyParts);
        }
        validator.validate_parts(&normalized.parts)?;
        Ok(normalized)
    }
}

/// Lookup table from format to codec.
///
/// # Examples
///
/// ```
/// use colloquy::message::codec::CodecRegistry;
/// use colloquy::message::domain::MessageFormat;
///
/// let registry = CodecRegistry::standard();
/// let codec = registry.get(MessageFormat::Anthropic).expect("registered");
/// assert_eq!(codec.format(), MessageFormat::Anthropic);
/// ```
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<MessageFormat, Arc<dyn MessageCodec>>,
}

impl CodecRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the codec of every supported format.
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with(CanonicalCodec)
            .with(OpenAiCodec)
            .with(AnthropicCodec)
    }

    /// Registers `codec` for its format, replacing any previous codec.
    #[must_use]
    pub fn with(mut self, codec: impl MessageCodec + 'static) -> Self {
        self.codecs.insert(codec.format(), Arc::new(codec));
        self
    }

    /// Returns the codec registered for `format`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnsupportedFormat`] when no codec is
    /// registered.
    pub fn get(&self, format: MessageFormat) -> ValidationResult<&dyn MessageCodec> {
        self.codecs
            .get(&format)
            .map(Arc::as_ref)
            .ok_or_else(|| ValidationError::UnsupportedFormat(format.to_string()))
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("formats", &self.codecs.keys().collect::<Vec<_>>())
            .finish()
    }
}
