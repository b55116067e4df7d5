//! The canonical format: the part model on the wire, verbatim.

use super::blocks::{client_part, content_of, object};
use super::{MessageCodec, NormalizedMessage, PublicUrls};
use crate::message::domain::{Message, MessageFormat, Role};
use crate::message::error::ValidationError;
use crate::message::ports::validator::ValidationResult;
use serde_json::{Map, Value};

/// Codec for `{ role, parts, meta? }` bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalCodec;

impl MessageCodec for CanonicalCodec {
    fn format(&self) -> MessageFormat {
        MessageFormat::Canonical
    }

    fn parse_incoming(&self, body: &Value) -> ValidationResult<NormalizedMessage> {
        let map = object(body, "message")?;

        let role: Role = map
            .get("role")
            .and_then(Value::as_str)
            .ok_or_else(|| ValidationError::malformed("role is required"))?
            .parse()?;

        let parts = match content_of(map) {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| client_part(index, item))
                .collect::<ValidationResult<Vec<_>>>()?,
            Some(_) => return Err(ValidationError::malformed("parts must be an array")),
        };

        let meta = match map.get("meta") {
            None | Some(Value::Null) => None,
            Some(Value::Object(meta)) => Some(meta.clone()),
            Some(_) => return Err(ValidationError::malformed("meta must be a JSON object")),
        };

        Ok(NormalizedMessage {
            meta,
            ..NormalizedMessage::new(role, parts)
        })
    }

    fn convert_outgoing(&self, message: &Message, _urls: &PublicUrls) -> Value {
        let mut out = Map::new();
        out.insert("id".to_owned(), Value::String(message.id().to_string()));
        out.insert(
            "session_id".to_owned(),
            Value::String(message.session_id().to_string()),
        );
        out.insert(
            "parent_id".to_owned(),
            message
                .parent_id()
                .map_or(Value::Null, |parent| Value::String(parent.to_string())),
        );
        out.insert(
            "created_at".to_owned(),
            Value::String(message.created_at().to_rfc3339()),
        );
        out.insert(
            "role".to_owned(),
            Value::String(message.role().as_str().to_owned()),
        );
        out.insert(
            "parts".to_owned(),
            serde_json::to_value(message.parts()).unwrap_or_else(|_| Value::Array(Vec::new())),
        );
        if let Some(meta) = message.meta() {
            out.insert("meta".to_owned(), Value::Object(meta.clone()));
        }
        Value::Object(out)
    }
}
