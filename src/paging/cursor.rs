//! Opaque keyset cursor over the `(created_at, id)` ordering key.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while decoding a client-supplied cursor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    /// The token is not valid base64.
    #[error("cursor is not valid base64")]
    Encoding,

    /// The decoded payload does not have the expected shape.
    #[error("malformed cursor payload: {0}")]
    Malformed(String),
}

/// Position of the last row a client has seen in a listing.
///
/// Clients receive cursors as opaque strings and feed them back unchanged;
/// the encoding is private to this type.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use colloquy::paging::Cursor;
/// use uuid::Uuid;
///
/// let created_at = Utc.timestamp_opt(0, 0).single().expect("epoch");
/// let cursor = Cursor::new(created_at, Uuid::nil());
/// let decoded = Cursor::decode(&cursor.encode()).expect("round trip");
/// assert_eq!(decoded, cursor);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cursor {
    created_at: DateTime<Utc>,
    id: Uuid,
}

impl Cursor {
    /// Creates a cursor positioned at the given row key.
    #[must_use]
    pub const fn new(created_at: DateTime<Utc>, id: Uuid) -> Self {
        Self { created_at, id }
    }

    /// Returns the creation timestamp of the row.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the row identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Encodes the cursor as a URL-safe opaque token.
    #[must_use]
    pub fn encode(&self) -> String {
        let payload = format!(
            "{}:{}:{}",
            self.created_at.timestamp(),
            self.created_at.timestamp_subsec_nanos(),
            self.id
        );
        URL_SAFE_NO_PAD.encode(payload)
    }

    /// Decodes a token produced by [`Cursor::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`CursorError`] when the token was not produced by `encode`.
    pub fn decode(token: &str) -> Result<Self, CursorError> {
        let raw = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| CursorError::Encoding)?;
        let payload = String::from_utf8(raw)
            .map_err(|_| CursorError::Malformed("payload is not UTF-8".to_owned()))?;

        let mut fields = payload.splitn(3, ':');
        let (Some(secs_text), Some(nanos_text), Some(id_text)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(CursorError::Malformed(
                "expected seconds, nanoseconds, and identifier".to_owned(),
            ));
        };

        let secs = secs_text
            .parse::<i64>()
            .map_err(|err| CursorError::Malformed(format!("seconds: {err}")))?;
        let nanos = nanos_text
            .parse::<u32>()
            .map_err(|err| CursorError::Malformed(format!("nanoseconds: {err}")))?;
        let created_at = DateTime::from_timestamp(secs, nanos)
            .ok_or_else(|| CursorError::Malformed("timestamp out of range".to_owned()))?;
        let id = Uuid::parse_str(id_text)
            .map_err(|err| CursorError::Malformed(format!("identifier: {err}")))?;

        Ok(Self { created_at, id })
    }

    /// Decodes an optional token, treating absent and empty values alike.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError`] when a non-empty token fails to decode.
    pub fn decode_optional(token: Option<&str>) -> Result<Option<Self>, CursorError> {
        match token.map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => Self::decode(value).map(Some),
        }
    }
}
