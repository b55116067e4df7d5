//! The canonical content part.

use crate::asset::domain::Asset;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Keys used inside [`Part::meta`] for type-specific fields.
///
/// Tool fields accept two synonymous keys so parts written by either chat
/// dialect validate the same way.
pub mod meta_keys {
    /// Tool-call identifier.
    pub const ID: &str = "id";
    /// Tool name.
    pub const NAME: &str = "name";
    /// Synonym for [`NAME`].
    pub const TOOL_NAME: &str = "tool_name";
    /// Tool arguments.
    pub const ARGUMENTS: &str = "arguments";
    /// Synonym for [`ARGUMENTS`].
    pub const INPUT: &str = "input";
    /// Identifier of the call a tool result answers.
    pub const TOOL_CALL_ID: &str = "tool_call_id";
    /// Synonym for [`TOOL_CALL_ID`].
    pub const TOOL_USE_ID: &str = "tool_use_id";
    /// Whether a tool result reports a failure.
    pub const IS_ERROR: &str = "is_error";
    /// Structured content of a tool result.
    pub const CONTENT: &str = "content";
    /// Tag naming the shape of a data part.
    pub const DATA_TYPE: &str = "data_type";

    /// Keys accepted for the tool name.
    pub const TOOL_NAME_KEYS: [&str; 2] = [NAME, TOOL_NAME];
    /// Keys accepted for the tool arguments.
    pub const ARGUMENT_KEYS: [&str; 2] = [ARGUMENTS, INPUT];
    /// Keys accepted for the correlating call identifier.
    pub const CALL_ID_KEYS: [&str; 2] = [TOOL_CALL_ID, TOOL_USE_ID];
}

/// Kind of content a part carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartType {
    /// Plain text.
    Text,
    /// Image attachment.
    Image,
    /// Audio attachment.
    Audio,
    /// Video attachment.
    Video,
    /// Generic file attachment.
    File,
    /// Tool invocation requested by the assistant.
    #[serde(alias = "tool-use")]
    ToolCall,
    /// Output of a tool invocation.
    ToolResult,
    /// Structured data tagged with a `data_type`.
    Data,
}

impl PartType {
    /// Returns the canonical wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::File => "file",
            Self::ToolCall => "tool-call",
            Self::ToolResult => "tool-result",
            Self::Data => "data",
        }
    }

    /// Returns `true` for types whose payload is a binary attachment.
    #[must_use]
    pub const fn is_media(self) -> bool {
        matches!(self, Self::Image | Self::Audio | Self::Video | Self::File)
    }
}

impl fmt::Display for PartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of message content.
///
/// Parts are immutable once their message is created. Media parts arrive
/// with a `file_field` naming the multipart field that supplies their bytes;
/// after upload the field is cleared and `asset` is set instead.
///
/// # Examples
///
/// ```
/// use colloquy::message::domain::{Part, PartType};
///
/// let part = Part::text("Hello");
/// assert_eq!(part.kind, PartType::Text);
/// assert_eq!(part.text.as_deref(), Some("Hello"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Kind of content.
    #[serde(rename = "type")]
    pub kind: PartType,
    /// Text body for text parts and tool results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Stored attachment, once uploaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<Asset>,
    /// Original filename of the attachment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Multipart field supplying the attachment bytes, before upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_field: Option<String>,
    /// Type-specific fields; see [`meta_keys`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl Part {
    /// Creates an empty part of the given kind.
    #[must_use]
    pub const fn new(kind: PartType) -> Self {
        Self {
            kind,
            text: None,
            asset: None,
            filename: None,
            file_field: None,
            meta: None,
        }
    }

    /// Creates a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(PartType::Text).with_text(text)
    }

    /// Creates a tool-call part with the unified meta keys.
    #[must_use]
    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        let mut meta = Map::new();
        meta.insert(meta_keys::ID.to_owned(), Value::String(id.into()));
        meta.insert(meta_keys::NAME.to_owned(), Value::String(name.into()));
        meta.insert(meta_keys::ARGUMENTS.to_owned(), arguments);
        Self::new(PartType::ToolCall).with_meta(meta)
    }

    /// Creates a tool-result part answering `call_id`.
    #[must_use]
    pub fn tool_result(call_id: impl Into<String>, output: Option<String>) -> Self {
        let mut meta = Map::new();
        meta.insert(
            meta_keys::TOOL_CALL_ID.to_owned(),
            Value::String(call_id.into()),
        );
        let mut part = Self::new(PartType::ToolResult).with_meta(meta);
        part.text = output;
        part
    }

    /// Creates a media part whose bytes arrive in the named multipart field.
    #[must_use]
    pub fn attachment(kind: PartType, file_field: impl Into<String>) -> Self {
        let mut part = Self::new(kind);
        part.file_field = Some(file_field.into());
        part
    }

    /// Sets the text body.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the type-specific fields.
    #[must_use]
    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Sets the original filename.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Returns the first meta value present under any of `keys`.
    #[must_use]
    pub fn meta_value(&self, keys: &[&str]) -> Option<&Value> {
        let meta = self.meta.as_ref()?;
        keys.iter().find_map(|key| meta.get(*key))
    }

    /// Returns the first non-empty string meta value under any of `keys`.
    #[must_use]
    pub fn meta_str(&self, keys: &[&str]) -> Option<&str> {
        let meta = self.meta.as_ref()?;
        keys.iter()
            .filter_map(|key| meta.get(*key).and_then(Value::as_str))
            .find(|value| !value.is_empty())
    }

    /// Returns `true` when `text` is present and non-empty.
    #[must_use]
    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|text| !text.is_empty())
    }
}
