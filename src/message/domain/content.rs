//! Typed view over a part's type-specific payload.
//!
//! The open `meta` map is convenient for storage and forward compatibility,
//! but renderers want a closed shape per part type. [`Part::content`]
//! projects a part into that shape once its type is known.

use super::part::{Part, PartType, meta_keys};
use crate::asset::domain::Asset;
use serde_json::{Map, Value};

/// Attachment kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Image.
    Image,
    /// Audio.
    Audio,
    /// Video.
    Video,
    /// Generic file.
    File,
}

/// Borrowed attachment fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Media<'a> {
    /// Attachment kind.
    pub kind: MediaKind,
    /// Stored asset, when uploaded.
    pub asset: Option<&'a Asset>,
    /// Pending multipart field, when not yet uploaded.
    pub file_field: Option<&'a str>,
    /// Original filename.
    pub filename: Option<&'a str>,
}

/// Borrowed tool invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolCall<'a> {
    /// Call identifier, absent in parts written without one.
    pub id: Option<&'a str>,
    /// Tool name.
    pub name: &'a str,
    /// Tool arguments.
    pub arguments: &'a Value,
}

/// Borrowed tool output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolResult<'a> {
    /// Identifier of the call this result answers.
    pub call_id: &'a str,
    /// Flattened text output.
    pub text: Option<&'a str>,
    /// Structured output blocks, when the producer sent them.
    pub content: Option<&'a Value>,
    /// Failure flag, when the producer set one.
    pub is_error: Option<bool>,
}

/// Closed, per-type projection of a [`Part`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PartContent<'a> {
    /// Text body.
    Text(&'a str),
    /// Attachment.
    Media(Media<'a>),
    /// Tool invocation.
    ToolCall(ToolCall<'a>),
    /// Tool output.
    ToolResult(ToolResult<'a>),
    /// Structured data.
    Data {
        /// Data type tag.
        data_type: &'a str,
        /// All data fields, including the tag.
        fields: &'a Map<String, Value>,
    },
}

impl Part {
    /// Projects the part into its typed shape.
    ///
    /// Returns `None` when required fields are missing, which can happen for
    /// rows written under older rules; renderers fall back to a generic
    /// block in that case.
    #[must_use]
    pub fn content(&self) -> Option<PartContent<'_>> {
        match self.kind {
            PartType::Text => self.text.as_deref().map(PartContent::Text),
            PartType::Image => Some(self.media(MediaKind::Image)),
            PartType::Audio => Some(self.media(MediaKind::Audio)),
            PartType::Video => Some(self.media(MediaKind::Video)),
            PartType::File => Some(self.media(MediaKind::File)),
            PartType::ToolCall => {
                let name = self.meta_str(&meta_keys::TOOL_NAME_KEYS)?;
                let arguments = self.meta_value(&meta_keys::ARGUMENT_KEYS)?;
                Some(PartContent::ToolCall(ToolCall {
                    id: self.meta_str(&[meta_keys::ID]),
                    name,
                    arguments,
                }))
            }
            PartType::ToolResult => {
                let call_id = self.meta_str(&meta_keys::CALL_ID_KEYS)?;
                Some(PartContent::ToolResult(ToolResult {
                    call_id,
                    text: self.text.as_deref(),
                    content: self.meta_value(&[meta_keys::CONTENT]),
                    is_error: self
                        .meta_value(&[meta_keys::IS_ERROR])
                        .and_then(Value::as_bool),
                }))
            }
            PartType::Data => {
                let fields = self.meta.as_ref()?;
                let data_type = fields.get(meta_keys::DATA_TYPE).and_then(Value::as_str)?;
                Some(PartContent::Data { data_type, fields })
            }
        }
    }

    fn media(&self, kind: MediaKind) -> PartContent<'_> {
        PartContent::Media(Media {
            kind,
            asset: self.asset.as_ref(),
            file_field: self.file_field.as_deref(),
            filename: self.filename.as_deref(),
        })
    }
}
