//! Binary payloads attached to a send request.

use std::collections::HashMap;

use crate::message::error::ValidationError;

/// One uploaded file, as received from a multipart field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedFile {
    /// Original filename supplied by the client.
    pub filename: Option<String>,
    /// Content type supplied by the client.
    pub content_type: Option<String>,
    /// Raw bytes.
    pub bytes: Vec<u8>,
}

impl AttachedFile {
    /// Creates a file from raw bytes.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self {
            filename: None,
            content_type: None,
            bytes,
        }
    }

    /// Sets the original filename.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Sets the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Files attached to a request, keyed by field name.
///
/// Parts refer to these entries through their `file_field`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachedFiles {
    files: HashMap<String, AttachedFile>,
}

impl AttachedFiles {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file under `field`, replacing any previous entry.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, file: AttachedFile) -> Self {
        self.insert(field, file);
        self
    }

    /// Adds a file under `field`, replacing any previous entry.
    pub fn insert(&mut self, field: impl Into<String>, file: AttachedFile) {
        self.files.insert(field.into(), file);
    }

    /// Returns the file supplied for `field`.
    #[must_use]
    pub fn resolve(&self, field: &str) -> Option<&AttachedFile> {
        self.files.get(field)
    }

    /// Takes the file supplied for `field` out of the set.
    pub fn take(&mut self, field: &str) -> Option<AttachedFile> {
        self.files.remove(field)
    }

    /// Moves every entry of `other` into this set.
    ///
    /// Nothing is moved when any name of `other` is already present.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ReservedField`] naming the first collision.
    pub fn absorb(&mut self, other: Self) -> Result<(), ValidationError> {
        let mut names: Vec<&String> = other.files.keys().collect();
        names.sort();
        if let Some(taken) = names.into_iter().find(|field| self.files.contains_key(*field)) {
            return Err(ValidationError::ReservedField {
                field: taken.clone(),
            });
        }
        self.files.extend(other.files);
        Ok(())
    }

    /// Returns the number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` when no files are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
