//! Anthropic messages.
//!
//! Only `user` and `assistant` roles exist on the wire; system prompts travel
//! outside the message list, so a `system` role is rejected on input and
//! rendered as `user` on output.

use super::blocks::{
    PASSTHROUGH_TYPE, PendingMedia, asset_url, block_type, content_of, decode_base64,
    is_plain_pending, meta_within, non_empty_str, object, passthrough, restore_passthrough,
    unfetchable,
};
use super::{MessageCodec, NormalizedMessage, PublicUrls};
use crate::message::domain::{
    AttachedFile, AttachedFiles, Message, MessageFormat, Part, PartContent, PartType, Role,
    meta_keys,
};
use crate::message::error::ValidationError;
use crate::message::ports::validator::ValidationResult;
use serde_json::{Map, Value, json};

const TITLE: &str = "title";
const TOOL_CALL_META: [&str; 3] = [meta_keys::ID, meta_keys::NAME, meta_keys::ARGUMENTS];
const TOOL_RESULT_META: [&str; 3] = [
    meta_keys::TOOL_CALL_ID,
    meta_keys::CONTENT,
    meta_keys::IS_ERROR,
];

/// Codec for Anthropic messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicCodec;

impl MessageCodec for AnthropicCodec {
    fn format(&self) -> MessageFormat {
        MessageFormat::Anthropic
    }

    fn parse_incoming(&self, body: &Value) -> ValidationResult<NormalizedMessage> {
        let map = object(body, "message")?;
        let role = match map.get("role").and_then(Value::as_str) {
            Some("user") => Role::User,
            Some("assistant") => Role::Assistant,
            Some("system") => {
                return Err(ValidationError::DisallowedRole {
                    role: "system".to_owned(),
                    format: MessageFormat::Anthropic.as_str(),
                });
            }
            Some(other) => return Err(ValidationError::UnknownRole(other.to_owned())),
            None => return Err(ValidationError::malformed("role is required")),
        };

        let mut inline = AttachedFiles::new();
        let parts = match content_of(map) {
            None => Vec::new(),
            Some(Value::String(text)) if text.is_empty() => {
                return Err(ValidationError::missing_field(0, "text"));
            }
            Some(Value::String(text)) => vec![Part::text(text.clone())],
            Some(Value::Array(blocks)) => blocks
                .iter()
                .enumerate()
                .map(|(index, block)| parse_block(index, block, &mut inline))
                .collect::<ValidationResult<Vec<_>>>()?,
            Some(_) => {
                return Err(ValidationError::malformed(
                    "content must be a string or an array",
                ));
            }
        };

        Ok(NormalizedMessage {
            inline_files: inline,
            ..NormalizedMessage::new(role, parts)
        })
    }

    fn convert_outgoing(&self, message: &Message, urls: &PublicUrls) -> Value {
        let role = match message.role() {
            Role::Assistant => "assistant",
            Role::User | Role::System => "user",
        };
        let content = match message.parts() {
            [part] if part.kind == PartType::Text && part.meta.is_none() && part.has_text() => {
                json!(part.text)
            }
            parts => Value::Array(parts.iter().map(|part| render_block(part, urls)).collect()),
        };
        json!({ "role": role, "content": content })
    }
}

fn parse_block(index: usize, raw: &Value, inline: &mut AttachedFiles) -> ValidationResult<Part> {
    let block = object(raw, "content block")?;
    match block_type(index, block)? {
        "text" => non_empty_str(block, "text")
            .map(Part::text)
            .ok_or_else(|| ValidationError::missing_field(index, "text")),
        "image" => parse_source(PendingMedia::new(index, PartType::Image, inline), index, block),
        "document" => {
            let mut part =
                parse_source(PendingMedia::new(index, PartType::File, inline), index, block)?;
            part.filename = non_empty_str(block, TITLE).map(str::to_owned);
            Ok(part)
        }
        "tool_use" => parse_tool_use(index, block),
        "tool_result" => parse_tool_result(index, block),
        PASSTHROUGH_TYPE => restore_passthrough(index, block),
        other => Err(ValidationError::invalid_part(
            index,
            format!("unsupported block type '{other}'"),
        )),
    }
}

/// Resolves a media block's `source`, or its `file_field` when present.
fn parse_source(
    pending: PendingMedia<'_>,
    index: usize,
    block: &Map<String, Value>,
) -> ValidationResult<Part> {
    if let Some(field) = non_empty_str(block, "file_field") {
        return Ok(pending.from_field(field));
    }

    let source = block
        .get("source")
        .and_then(Value::as_object)
        .ok_or_else(|| ValidationError::missing_field(index, "source"))?;
    let media_type = non_empty_str(source, "media_type").map(str::to_owned);
    let data = non_empty_str(source, "data");

    let bytes = match (non_empty_str(source, "type"), data) {
        (Some("base64"), Some(payload)) => decode_base64(index, payload)?,
        (Some("text"), Some(payload)) => payload.as_bytes().to_vec(),
        (Some("base64" | "text"), None) => {
            return Err(ValidationError::missing_field(index, "source.data"));
        }
        (Some("url"), _) => return Err(unfetchable(index, "a remote source URL")),
        (Some("file"), _) => return Err(unfetchable(index, "a provider file id")),
        (Some(other), _) => {
            return Err(ValidationError::invalid_part(
                index,
                format!("unsupported source type '{other}'"),
            ));
        }
        (None, _) => return Err(ValidationError::missing_field(index, "source.type")),
    };

    Ok(pending.from_inline(AttachedFile {
        filename: non_empty_str(block, TITLE).map(str::to_owned),
        content_type: media_type,
        bytes,
    }))
}

fn parse_tool_use(index: usize, block: &Map<String, Value>) -> ValidationResult<Part> {
    let id = non_empty_str(block, meta_keys::ID)
        .ok_or_else(|| ValidationError::missing_field(index, "id"))?;

    let mut meta = Map::new();
    meta.insert(meta_keys::ID.to_owned(), Value::String(id.to_owned()));
    if let Some(name) = block.get(meta_keys::NAME) {
        meta.insert(meta_keys::NAME.to_owned(), name.clone());
    }
    if let Some(input) = block.get(meta_keys::INPUT) {
        meta.insert(meta_keys::ARGUMENTS.to_owned(), input.clone());
    }
    Ok(Part::new(PartType::ToolCall).with_meta(meta))
}

fn parse_tool_result(index: usize, block: &Map<String, Value>) -> ValidationResult<Part> {
    let call_id = non_empty_str(block, meta_keys::TOOL_USE_ID)
        .ok_or_else(|| ValidationError::missing_field(index, "tool_use_id"))?;

    let mut meta = Map::new();
    meta.insert(
        meta_keys::TOOL_CALL_ID.to_owned(),
        Value::String(call_id.to_owned()),
    );
    let text = match block.get(meta_keys::CONTENT) {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(Value::Array(items)) => {
            meta.insert(meta_keys::CONTENT.to_owned(), Value::Array(items.clone()));
            joined_text(items)
        }
        Some(_) => {
            return Err(ValidationError::invalid_part(
                index,
                "tool_result content must be a string or an array",
            ));
        }
    };
    if let Some(flag) = block.get(meta_keys::IS_ERROR).and_then(Value::as_bool) {
        meta.insert(meta_keys::IS_ERROR.to_owned(), Value::Bool(flag));
    }

    let mut part = Part::new(PartType::ToolResult).with_meta(meta);
    part.text = text;
    Ok(part)
}

/// Joins the text blocks of a structured tool result.
fn joined_text(items: &[Value]) -> Option<String> {
    let texts: Vec<&str> = items
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .collect();
    (!texts.is_empty()).then(|| texts.join("\n"))
}

fn render_block(part: &Part, urls: &PublicUrls) -> Value {
    match (part.kind, part.content()) {
        (PartType::Text, Some(PartContent::Text(text))) if part.meta.is_none() => {
            json!({ "type": "text", "text": text })
        }
        (PartType::Image, _) => render_media(part, "image", false, urls),
        (PartType::File, _) => render_media(part, "document", true, urls),
        (PartType::ToolCall, Some(PartContent::ToolCall(call)))
            if call.id.is_some() && meta_within(part, &TOOL_CALL_META) =>
        {
            json!({
                "type": "tool_use",
                "id": call.id,
                "name": call.name,
                "input": call.arguments,
            })
        }
        (PartType::ToolResult, Some(PartContent::ToolResult(result)))
            if is_plain_tool_result(part) =>
        {
            let mut block = Map::new();
            block.insert("type".to_owned(), json!("tool_result"));
            block.insert(meta_keys::TOOL_USE_ID.to_owned(), json!(result.call_id));
            if let Some(content) = result.content {
                block.insert(meta_keys::CONTENT.to_owned(), content.clone());
            } else if let Some(text) = result.text {
                block.insert(meta_keys::CONTENT.to_owned(), json!(text));
            }
            if let Some(flag) = result.is_error {
                block.insert(meta_keys::IS_ERROR.to_owned(), json!(flag));
            }
            Value::Object(block)
        }
        _ => passthrough(part),
    }
}

/// A tool result renders natively when the block would parse back into the
/// same part.
fn is_plain_tool_result(part: &Part) -> bool {
    if !meta_within(part, &TOOL_RESULT_META) || part.meta_str(&[meta_keys::TOOL_CALL_ID]).is_none()
    {
        return false;
    }
    if part
        .meta_value(&[meta_keys::IS_ERROR])
        .is_some_and(|flag| !flag.is_boolean())
    {
        return false;
    }
    match part.meta_value(&[meta_keys::CONTENT]) {
        None => true,
        Some(Value::Array(items)) => joined_text(items) == part.text,
        Some(_) => false,
    }
}

/// Renders an image or document block; only documents carry a title.
fn render_media(part: &Part, kind: &str, titled: bool, urls: &PublicUrls) -> Value {
    let mut block = Map::new();
    block.insert("type".to_owned(), json!(kind));
    if let Some(filename) = part.filename.as_ref().filter(|_| titled) {
        block.insert(TITLE.to_owned(), json!(filename));
    }

    if let Some(asset) = &part.asset {
        block.insert(
            "source".to_owned(),
            json!({ "type": "url", "url": asset_url(asset, urls) }),
        );
        return Value::Object(block);
    }
    if is_plain_pending(part, &[]) && (titled || part.filename.is_none()) {
        block.insert("file_field".to_owned(), json!(part.file_field));
        return Value::Object(block);
    }
    passthrough(part)
}
