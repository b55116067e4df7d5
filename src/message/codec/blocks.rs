//! Helpers shared by the dialect codecs.

use super::PublicUrls;
use crate::asset::domain::Asset;
use crate::message::domain::{AttachedFile, AttachedFiles, Part, PartType};
use crate::message::error::ValidationError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value, json};

/// Block type of the passthrough rendering every dialect understands.
pub const PASSTHROUGH_TYPE: &str = "data";

/// Borrows `value` as a JSON object.
pub fn object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, ValidationError> {
    value
        .as_object()
        .ok_or_else(|| ValidationError::malformed(format!("{what} must be a JSON object")))
}

/// Returns the string under `key` when present and non-empty.
pub fn non_empty_str<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

/// Returns the block's `type` tag.
pub fn block_type(index: usize, block: &Map<String, Value>) -> Result<&str, ValidationError> {
    block
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::missing_field(index, "type"))
}

/// Returns the message content, accepting `parts` as an alias of `content`.
pub fn content_of(body: &Map<String, Value>) -> Option<&Value> {
    body.get("content")
        .or_else(|| body.get("parts"))
        .filter(|value| !value.is_null())
}

/// Renders a part as the generic data block.
pub fn passthrough(part: &Part) -> Value {
    json!({ "type": PASSTHROUGH_TYPE, "part": part })
}

/// Restores a part from a passthrough block.
pub fn restore_passthrough(
    index: usize,
    block: &Map<String, Value>,
) -> Result<Part, ValidationError> {
    let raw = block
        .get("part")
        .ok_or_else(|| ValidationError::missing_field(index, "part"))?;
    let part: Part = serde_json::from_value(raw.clone())
        .map_err(|err| ValidationError::invalid_part(index, format!("invalid data block: {err}")))?;
    without_asset(index, part)
}

/// Deserializes a part supplied by a client.
pub fn client_part(index: usize, raw: &Value) -> Result<Part, ValidationError> {
    let part: Part = serde_json::from_value(raw.clone())
        .map_err(|err| ValidationError::invalid_part(index, err.to_string()))?;
    without_asset(index, part)
}

/// Rejects a client part that carries an asset descriptor.
///
/// Descriptors are assigned only when the store uploads an attachment.
fn without_asset(index: usize, part: Part) -> Result<Part, ValidationError> {
    if part.asset.is_some() {
        return Err(ValidationError::invalid_part(
            index,
            "asset is assigned by the store; send a payload or file_field instead",
        ));
    }
    Ok(part)
}

/// Name under which an inline payload of part `index` is registered.
pub fn inline_field(index: usize) -> String {
    format!("inline-{index}")
}

/// Decodes a standard base64 payload.
pub fn decode_base64(index: usize, data: &str) -> Result<Vec<u8>, ValidationError> {
    STANDARD
        .decode(data)
        .map_err(|err| ValidationError::invalid_part(index, format!("invalid base64 payload: {err}")))
}

/// Decodes a `data:<mime>;base64,<payload>` URL.
///
/// Returns `Ok(None)` when `url` is not a data URL.
pub fn decode_data_url(
    index: usize,
    url: &str,
) -> Result<Option<AttachedFile>, ValidationError> {
    let Some(rest) = url.strip_prefix("data:") else {
        return Ok(None);
    };
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ValidationError::invalid_part(index, "data URL has no payload"))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| ValidationError::invalid_part(index, "data URL must be base64 encoded"))?;

    let file = AttachedFile::new(decode_base64(index, payload)?);
    Ok(Some(if mime.is_empty() {
        file
    } else {
        file.with_content_type(mime)
    }))
}

/// Error for references the store cannot fetch on the client's behalf.
pub fn unfetchable(index: usize, what: &str) -> ValidationError {
    ValidationError::invalid_part(
        index,
        format!("{what} cannot be stored; send the bytes inline or as a multipart file"),
    )
}

/// Returns the URL a client should use to fetch `asset`.
///
/// Falls back to the content address when no presigned URL was resolved.
pub fn asset_url(asset: &Asset, urls: &PublicUrls) -> String {
    urls.get(&asset.sha256)
        .map_or_else(|| asset.content_address(), |public| public.url.clone())
}

/// Returns `true` when every meta key of `part` is in `allowed`.
pub fn meta_within(part: &Part, allowed: &[&str]) -> bool {
    part.meta
        .as_ref()
        .is_none_or(|meta| meta.keys().all(|key| allowed.contains(&key.as_str())))
}

/// Returns `true` for a media part still waiting for its multipart payload,
/// carrying nothing a dialect block could not express.
pub fn is_plain_pending(part: &Part, allowed_meta: &[&str]) -> bool {
    part.asset.is_none() && part.file_field.is_some() && meta_within(part, allowed_meta)
}

/// Builds a pending media part and registers an inline payload for it.
pub struct PendingMedia<'a> {
    index: usize,
    kind: PartType,
    inline: &'a mut AttachedFiles,
}

impl<'a> PendingMedia<'a> {
    /// Starts a media part at position `index`.
    pub const fn new(
        index: usize,
        kind: PartType,
        inline: &'a mut AttachedFiles,
    ) -> Self {
        Self {
            index,
            kind,
            inline,
        }
    }

    /// Refers to a client-supplied multipart field.
    pub fn from_field(self, field: &str) -> Part {
        Part::attachment(self.kind, field)
    }

    /// Registers decoded bytes under the generated inline field.
    pub fn from_inline(self, file: AttachedFile) -> Part {
        let field = inline_field(self.index);
        self.inline.insert(field.clone(), file);
        Part::attachment(self.kind, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn data_url_is_decoded_with_its_mime() {
        let file = decode_data_url(0, "data:image/png;base64,aGVsbG8=")
            .expect("valid")
            .expect("data url");
        assert_eq!(file.bytes, b"hello");
        assert_eq!(file.content_type.as_deref(), Some("image/png"));
    }

    #[rstest]
    fn remote_urls_are_not_data_urls() {
        assert_eq!(decode_data_url(0, "https://example.com/a.png"), Ok(None));
    }

    #[rstest]
    #[case::no_payload("data:image/png;base64")]
    #[case::not_base64_marked("data:text/plain,hello")]
    #[case::bad_payload("data:image/png;base64,@@@")]
    fn broken_data_urls_are_rejected(#[case] url: &str) {
        assert!(matches!(
            decode_data_url(4, url),
            Err(ValidationError::InvalidPart { index: 4, .. })
        ));
    }

    #[rstest]
    fn passthrough_restores_the_part() {
        let part = Part::new(PartType::Video).with_filename("clip.mp4");
        let block = passthrough(&part);
        let restored = restore_passthrough(0, block.as_object().expect("object")).expect("part");
        assert_eq!(restored, part);
    }

    #[rstest]
    #[case::passthrough_block(true)]
    #[case::client_part(false)]
    fn client_supplied_assets_are_rejected(#[case] via_passthrough: bool) {
        let forged = json!({
            "type": "image",
            "asset": {
                "bucket": "memory",
                "key": "assets/someone-else/abc.png",
                "etag": "abc",
                "sha256": "abc",
                "mime": "image/png",
                "size_bytes": 3
            }
        });

        let outcome = if via_passthrough {
            let block = json!({"type": PASSTHROUGH_TYPE, "part": forged});
            restore_passthrough(2, block.as_object().expect("object"))
        } else {
            client_part(2, &forged)
        };

        let err = outcome.expect_err("asset must not be accepted");
        assert!(
            matches!(&err, ValidationError::InvalidPart { index: 2, reason } if reason.starts_with("asset is assigned")),
            "unexpected error: {err}"
        );
    }
}
