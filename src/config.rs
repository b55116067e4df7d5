//! Runtime configuration for the message store.
//!
//! Values come from [`StoreConfig::default`] and may be overridden with
//! environment variables:
//!
//! - `COLLOQUY_ASSET_PREFIX`: object-key prefix for uploaded attachments
//!   (default: `assets`)
//! - `COLLOQUY_PARTS_PREFIX`: object-key prefix for parts blobs
//!   (default: `parts`)
//! - `COLLOQUY_PRESIGN_TTL_SECS`: lifetime of presigned URLs (default: 86400)
//! - `COLLOQUY_PUBLISH_TIMEOUT_MS`: bounded wait for notifications
//!   (default: 2000)
//! - `COLLOQUY_STORAGE_TIMEOUT_SECS`: bound on each object-store call
//!   (default: 30)
//! - `COLLOQUY_PAGE_DEFAULT_LIMIT` / `COLLOQUY_PAGE_MAX_LIMIT`: page sizes
//! - `COLLOQUY_MAX_PARTS` / `COLLOQUY_MAX_TEXT_LENGTH`: validation bounds

use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::ids::ProjectId;
use crate::message::ports::validator::ValidationConfig;
use crate::paging::PageLimits;

/// Errors raised while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable was set to a value that cannot be used.
    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        /// Environment variable name.
        name: &'static str,
        /// Raw value found.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Settings shared by the message pipeline and the session service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Object-key prefix for uploaded attachments.
    pub asset_prefix: String,
    /// Object-key prefix for serialized parts blobs.
    pub parts_prefix: String,
    /// Lifetime of presigned read URLs.
    pub presign_ttl: Duration,
    /// Longest wait for a change notification before giving up.
    pub publish_timeout: Duration,
    /// Bound on each object-store call.
    pub storage_timeout: Duration,
    /// Page size bounds for listings.
    pub page_limits: PageLimits,
    /// Part validation bounds.
    pub validation: ValidationConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            asset_prefix: "assets".to_owned(),
            parts_prefix: "parts".to_owned(),
            presign_ttl: Duration::from_secs(24 * 60 * 60),
            publish_timeout: Duration::from_secs(2),
            storage_timeout: Duration::from_secs(30),
            page_limits: PageLimits::default(),
            validation: ValidationConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Reads the configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a variable does not parse
    /// or the page bounds are inconsistent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a value does not parse or
    /// the page bounds are inconsistent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let default_limit = parse_var(
            &lookup,
            "COLLOQUY_PAGE_DEFAULT_LIMIT",
            defaults.page_limits.default_limit,
        )?;
        let max_limit = parse_var(
            &lookup,
            "COLLOQUY_PAGE_MAX_LIMIT",
            defaults.page_limits.max_limit,
        )?;
        if default_limit == 0 || default_limit > max_limit {
            return Err(ConfigError::InvalidValue {
                name: "COLLOQUY_PAGE_DEFAULT_LIMIT",
                value: default_limit.to_string(),
                reason: format!("must be between 1 and {max_limit}"),
            });
        }

        Ok(Self {
            asset_prefix: lookup("COLLOQUY_ASSET_PREFIX").unwrap_or(defaults.asset_prefix),
            parts_prefix: lookup("COLLOQUY_PARTS_PREFIX").unwrap_or(defaults.parts_prefix),
            presign_ttl: Duration::from_secs(parse_var(
                &lookup,
                "COLLOQUY_PRESIGN_TTL_SECS",
                defaults.presign_ttl.as_secs(),
            )?),
            publish_timeout: Duration::from_millis(parse_var(
                &lookup,
                "COLLOQUY_PUBLISH_TIMEOUT_MS",
                2_000,
            )?),
            storage_timeout: Duration::from_secs(parse_var(
                &lookup,
                "COLLOQUY_STORAGE_TIMEOUT_SECS",
                defaults.storage_timeout.as_secs(),
            )?),
            page_limits: PageLimits {
                default_limit,
                max_limit,
            },
            validation: ValidationConfig {
                max_parts: parse_var(
                    &lookup,
                    "COLLOQUY_MAX_PARTS",
                    defaults.validation.max_parts,
                )?,
                max_text_length: parse_var(
                    &lookup,
                    "COLLOQUY_MAX_TEXT_LENGTH",
                    defaults.validation.max_text_length,
                )?,
            },
        })
    }

    /// Returns the object-key namespace for a project's attachments.
    #[must_use]
    pub fn asset_namespace(&self, project_id: ProjectId) -> String {
        format!("{}/{project_id}", self.asset_prefix)
    }

    /// Returns the object-key namespace for a project's parts blobs.
    #[must_use]
    pub fn parts_namespace(&self, project_id: ProjectId) -> String {
        format!("{}/{project_id}", self.parts_prefix)
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        name,
        value: raw.clone(),
        reason: e.to_string(),
    })
}
