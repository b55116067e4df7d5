//! OpenAI chat-completion messages.
//!
//! Content may be a string, an array of typed blocks, or null, with
//! assistant tool invocations listed separately under `tool_calls`. Tool
//! output arrives as its own message with role `tool`.

use super::blocks::{
    PASSTHROUGH_TYPE, PendingMedia, asset_url, block_type, content_of, decode_base64,
    decode_data_url, is_plain_pending, meta_within, non_empty_str, object, passthrough,
    restore_passthrough, unfetchable,
};
use super::{MessageCodec, NormalizedMessage, PublicUrls};
use crate::message::domain::{
    AttachedFile, AttachedFiles, Message, MessageFormat, Part, PartContent, PartType, Role,
    meta_keys,
};
use crate::message::error::ValidationError;
use crate::message::ports::validator::ValidationResult;
use serde_json::{Map, Value, json};

const NAME: &str = "name";
const DETAIL: &str = "detail";
const TOOL_CALL_META: [&str; 3] = [meta_keys::ID, meta_keys::NAME, meta_keys::ARGUMENTS];
const TOOL_RESULT_META: [&str; 1] = [meta_keys::TOOL_CALL_ID];

/// Codec for OpenAI chat-completion messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiCodec;

impl MessageCodec for OpenAiCodec {
    fn format(&self) -> MessageFormat {
        MessageFormat::OpenAi
    }

    fn parse_incoming(&self, body: &Value) -> ValidationResult<NormalizedMessage> {
        let map = object(body, "message")?;
        let role_name = map
            .get("role")
            .and_then(Value::as_str)
            .ok_or_else(|| ValidationError::malformed("role is required"))?;

        let mut normalized = match role_name {
            "tool" | "function" => parse_tool_message(map)?,
            other => {
                let mut inline = AttachedFiles::new();
                let mut parts = parse_content(map, &mut inline)?;
                parse_tool_calls(map, &mut parts)?;
                NormalizedMessage {
                    inline_files: inline,
                    ..NormalizedMessage::new(map_role(other)?, parts)
                }
            }
        };
        normalized.meta = non_empty_str(map, NAME).map(|name| {
            let mut meta = Map::new();
            meta.insert(NAME.to_owned(), Value::String(name.to_owned()));
            meta
        });
        Ok(normalized)
    }

    fn convert_outgoing(&self, message: &Message, urls: &PublicUrls) -> Value {
        let mut out = Map::new();
        let parts = message.parts();

        if let Some((call_id, output)) = lone_tool_result(message) {
            out.insert("role".to_owned(), json!("tool"));
            out.insert(meta_keys::TOOL_CALL_ID.to_owned(), json!(call_id));
            out.insert("content".to_owned(), json!(output.unwrap_or_default()));
        } else {
            let split = trailing_tool_calls_start(parts);
            let (content_parts, call_parts) = parts.split_at(split);

            out.insert("role".to_owned(), json!(message.role().as_str()));
            out.insert("content".to_owned(), render_content(content_parts, urls));
            if !call_parts.is_empty() {
                out.insert(
                    "tool_calls".to_owned(),
                    Value::Array(call_parts.iter().map(render_tool_call).collect()),
                );
            }
        }

        if let Some(name) = message
            .meta()
            .and_then(|meta| meta.get(NAME))
            .and_then(Value::as_str)
        {
            out.insert(NAME.to_owned(), json!(name));
        }
        Value::Object(out)
    }
}

fn map_role(name: &str) -> ValidationResult<Role> {
    match name {
        "system" | "developer" => Ok(Role::System),
        "user" => Ok(Role::User),
        "assistant" => Ok(Role::Assistant),
        other => Err(ValidationError::UnknownRole(other.to_owned())),
    }
}

fn parse_tool_message(map: &Map<String, Value>) -> ValidationResult<NormalizedMessage> {
    let call_id = non_empty_str(map, meta_keys::TOOL_CALL_ID)
        .ok_or_else(|| ValidationError::missing_field(0, "tool_call_id"))?;

    let output = match content_of(map) {
        None => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(Value::Array(blocks)) => Some(
            blocks
                .iter()
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Some(_) => {
            return Err(ValidationError::malformed(
                "tool content must be a string or an array",
            ));
        }
    };

    Ok(NormalizedMessage::new(
        Role::User,
        vec![Part::tool_result(
            call_id,
            output.filter(|text| !text.is_empty()),
        )],
    ))
}

fn parse_content(
    map: &Map<String, Value>,
    inline: &mut AttachedFiles,
) -> ValidationResult<Vec<Part>> {
    match content_of(map) {
        None => Ok(Vec::new()),
        Some(Value::String(text)) if text.is_empty() => Ok(Vec::new()),
        Some(Value::String(text)) => Ok(vec![Part::text(text.clone())]),
        Some(Value::Array(blocks)) => blocks
            .iter()
            .enumerate()
            .map(|(index, block)| parse_block(index, block, inline))
            .collect(),
        Some(_) => Err(ValidationError::malformed(
            "content must be a string, an array, or null",
        )),
    }
}

fn parse_block(index: usize, raw: &Value, inline: &mut AttachedFiles) -> ValidationResult<Part> {
    let block = object(raw, "content block")?;
    match block_type(index, block)? {
        "text" => Ok(text_part(block.get("text"))),
        "refusal" => Ok(text_part(block.get("refusal"))),
        "image_url" => parse_image(index, block, inline),
        "input_audio" => parse_audio(index, block, inline),
        "file" => parse_file(index, block, inline),
        "tool_call" => parse_tool_call(index, block),
        "tool_result" => parse_inline_tool_result(index, block),
        PASSTHROUGH_TYPE => restore_passthrough(index, block),
        other => Err(ValidationError::invalid_part(
            index,
            format!("unsupported block type '{other}'"),
        )),
    }
}

fn text_part(text: Option<&Value>) -> Part {
    let mut part = Part::new(PartType::Text);
    part.text = text.and_then(Value::as_str).map(str::to_owned);
    part
}

fn parse_image(
    index: usize,
    block: &Map<String, Value>,
    inline: &mut AttachedFiles,
) -> ValidationResult<Part> {
    let pending = PendingMedia::new(index, PartType::Image, inline);
    let image = block.get("image_url");

    let part = match non_empty_str(block, "file_field") {
        Some(field) => pending.from_field(field),
        None => {
            let url = image
                .and_then(|value| match value {
                    Value::String(url) => Some(url.as_str()),
                    Value::Object(fields) => fields.get("url").and_then(Value::as_str),
                    _ => None,
                })
                .ok_or_else(|| ValidationError::missing_field(index, "image_url.url"))?;
            let file =
                decode_data_url(index, url)?.ok_or_else(|| unfetchable(index, "a remote image URL"))?;
            pending.from_inline(file)
        }
    };

    let Some(level) = image
        .and_then(|value| value.get(DETAIL))
        .and_then(Value::as_str)
    else {
        return Ok(part);
    };
    let mut meta = Map::new();
    meta.insert(DETAIL.to_owned(), Value::String(level.to_owned()));
    Ok(part.with_meta(meta))
}

fn parse_audio(
    index: usize,
    block: &Map<String, Value>,
    inline: &mut AttachedFiles,
) -> ValidationResult<Part> {
    let pending = PendingMedia::new(index, PartType::Audio, inline);
    if let Some(field) = non_empty_str(block, "file_field") {
        return Ok(pending.from_field(field));
    }

    let audio = block
        .get("input_audio")
        .and_then(Value::as_object)
        .ok_or_else(|| ValidationError::missing_field(index, "input_audio"))?;
    let data = non_empty_str(audio, "data")
        .ok_or_else(|| ValidationError::missing_field(index, "input_audio.data"))?;
    Ok(pending.from_inline(AttachedFile {
        filename: None,
        content_type: non_empty_str(audio, "format").map(|format| format!("audio/{format}")),
        bytes: decode_base64(index, data)?,
    }))
}

fn parse_file(
    index: usize,
    block: &Map<String, Value>,
    inline: &mut AttachedFiles,
) -> ValidationResult<Part> {
    let pending = PendingMedia::new(index, PartType::File, inline);
    let file = block.get("file").and_then(Value::as_object);
    let filename = file.and_then(|fields| non_empty_str(fields, "filename"));

    let mut part = match (non_empty_str(block, "file_field"), file) {
        (Some(field), _) => pending.from_field(field),
        (None, Some(fields)) => {
            if non_empty_str(fields, "file_id").is_some() {
                return Err(unfetchable(index, "a provider file id"));
            }
            let data = non_empty_str(fields, "file_data")
                .ok_or_else(|| ValidationError::missing_field(index, "file.file_data"))?;
            let mut payload = match decode_data_url(index, data)? {
                Some(decoded) => decoded,
                None => AttachedFile::new(decode_base64(index, data)?),
            };
            payload.filename = filename.map(str::to_owned);
            pending.from_inline(payload)
        }
        (None, None) => return Err(ValidationError::missing_field(index, "file")),
    };

    part.filename = filename.map(str::to_owned);
    Ok(part)
}

fn parse_tool_call(index: usize, block: &Map<String, Value>) -> ValidationResult<Part> {
    let id = non_empty_str(block, meta_keys::ID)
        .ok_or_else(|| ValidationError::missing_field(index, "id"))?;
    let function = block.get("function").and_then(Value::as_object);
    Ok(tool_call_part(id, function))
}

fn parse_inline_tool_result(index: usize, block: &Map<String, Value>) -> ValidationResult<Part> {
    let call_id = non_empty_str(block, meta_keys::TOOL_CALL_ID)
        .ok_or_else(|| ValidationError::missing_field(index, "tool_call_id"))?;
    let output = block
        .get("output")
        .and_then(Value::as_str)
        .map(str::to_owned);
    Ok(Part::tool_result(call_id, output))
}

fn parse_tool_calls(map: &Map<String, Value>, parts: &mut Vec<Part>) -> ValidationResult<()> {
    let Some(calls) = map.get("tool_calls").filter(|value| !value.is_null()) else {
        return Ok(());
    };
    let entries = calls
        .as_array()
        .ok_or_else(|| ValidationError::malformed("tool_calls must be an array"))?;

    for (index, entry) in entries.iter().enumerate() {
        let call = object(entry, "tool call")?;
        let id = non_empty_str(call, meta_keys::ID)
            .ok_or_else(|| ValidationError::missing_field(index, "id"))?;
        parts.push(tool_call_part(
            id,
            call.get("function").and_then(Value::as_object),
        ));
    }
    Ok(())
}

/// Builds a tool-call part; arguments sent as a JSON string are parsed when
/// they hold valid JSON.
fn tool_call_part(id: &str, function: Option<&Map<String, Value>>) -> Part {
    let mut meta = Map::new();
    meta.insert(meta_keys::ID.to_owned(), Value::String(id.to_owned()));
    if let Some(name) = function.and_then(|fields| fields.get(meta_keys::NAME)) {
        meta.insert(meta_keys::NAME.to_owned(), name.clone());
    }
    if let Some(arguments) = function.and_then(|fields| fields.get(meta_keys::ARGUMENTS)) {
        let value = match arguments {
            Value::String(text) => serde_json::from_str(text).unwrap_or_else(|_| arguments.clone()),
            other => other.clone(),
        };
        meta.insert(meta_keys::ARGUMENTS.to_owned(), value);
    }
    Part::new(PartType::ToolCall).with_meta(meta)
}

/// Returns the call id and output when the message is a single tool result
/// expressible as a `tool` role message.
fn lone_tool_result(message: &Message) -> Option<(&str, Option<&str>)> {
    let [part] = message.parts() else {
        return None;
    };
    if message.role() != Role::User || !meta_within(part, &TOOL_RESULT_META) {
        return None;
    }
    match part.content()? {
        PartContent::ToolResult(result) if result.text != Some("") => {
            Some((result.call_id, result.text))
        }
        _ => None,
    }
}

/// Index of the first part of the trailing run of plain tool calls.
fn trailing_tool_calls_start(parts: &[Part]) -> usize {
    let trailing = parts
        .iter()
        .rev()
        .take_while(|part| is_plain_tool_call(part))
        .count();
    parts.len().saturating_sub(trailing)
}

fn is_plain_tool_call(part: &Part) -> bool {
    matches!(
        part.content(),
        Some(PartContent::ToolCall(call)) if call.id.is_some()
    ) && part.meta_str(&[meta_keys::NAME]).is_some()
        && part.meta_value(&[meta_keys::ARGUMENTS]).is_some()
        && meta_within(part, &TOOL_CALL_META)
}

fn render_content(parts: &[Part], urls: &PublicUrls) -> Value {
    match parts {
        [] => Value::Null,
        [part] if part.kind == PartType::Text && part.meta.is_none() && part.has_text() => {
            json!(part.text)
        }
        _ => Value::Array(parts.iter().map(|part| render_block(part, urls)).collect()),
    }
}

fn render_block(part: &Part, urls: &PublicUrls) -> Value {
    match part.kind {
        PartType::Text if part.meta.is_none() && part.text.is_some() => {
            json!({ "type": "text", "text": part.text })
        }
        PartType::Image => render_image(part, urls),
        PartType::File => render_file(part, urls),
        PartType::ToolCall if is_plain_tool_call(part) => {
            let mut block = render_tool_call(part);
            if let Value::Object(fields) = &mut block {
                fields.insert("type".to_owned(), json!("tool_call"));
            }
            block
        }
        PartType::ToolResult if meta_within(part, &TOOL_RESULT_META) => {
            match part.content() {
                Some(PartContent::ToolResult(result)) => {
                    let mut block = Map::new();
                    block.insert("type".to_owned(), json!("tool_result"));
                    block.insert(meta_keys::TOOL_CALL_ID.to_owned(), json!(result.call_id));
                    if let Some(output) = result.text {
                        block.insert("output".to_owned(), json!(output));
                    }
                    Value::Object(block)
                }
                _ => passthrough(part),
            }
        }
        _ => passthrough(part),
    }
}

fn render_image(part: &Part, urls: &PublicUrls) -> Value {
    let detail = part.meta_value(&[DETAIL]).cloned();
    if let Some(asset) = &part.asset {
        let mut image = Map::new();
        image.insert("url".to_owned(), json!(asset_url(asset, urls)));
        if let Some(level) = detail {
            image.insert(DETAIL.to_owned(), level);
        }
        return json!({ "type": "image_url", "image_url": image });
    }
    if is_plain_pending(part, &[DETAIL]) && part.filename.is_none() {
        let mut image = Map::new();
        if let Some(level) = detail {
            image.insert(DETAIL.to_owned(), level);
        }
        return json!({ "type": "image_url", "image_url": image, "file_field": part.file_field });
    }
    passthrough(part)
}

fn render_file(part: &Part, urls: &PublicUrls) -> Value {
    let mut file = Map::new();
    if let Some(filename) = &part.filename {
        file.insert("filename".to_owned(), json!(filename));
    }
    if let Some(asset) = &part.asset {
        file.insert("file_url".to_owned(), json!(asset_url(asset, urls)));
        return json!({ "type": "file", "file": file });
    }
    if is_plain_pending(part, &[]) {
        return json!({ "type": "file", "file": file, "file_field": part.file_field });
    }
    passthrough(part)
}

fn render_tool_call(part: &Part) -> Value {
    let id = part.meta_value(&[meta_keys::ID]).cloned().unwrap_or(Value::Null);
    let name = part.meta_value(&[meta_keys::NAME]).cloned().unwrap_or(Value::Null);
    let arguments = part
        .meta_value(&[meta_keys::ARGUMENTS])
        .map_or_else(String::new, Value::to_string);
    json!({
        "id": id,
        "type": "function",
        "function": { "name": name, "arguments": arguments },
    })
}
