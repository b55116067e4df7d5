//! Message pipeline: the send and read paths for session messages.
//!
//! Sending walks a message through normalization, attachment resolution,
//! uploads, parts serialization, the database commit, and a best-effort
//! notification. Reading pages through the session with keyset cursors and
//! renders each message in the requested format. Stored messages are later
//! claimed in batches by the task worker.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::asset::{
    domain::{Asset, PublicUrl},
    ports::ObjectStore,
    services::AssetStore,
};
use crate::config::StoreConfig;
use crate::ids::{MessageId, ProjectId, SessionId};
use crate::message::{
    codec::{CodecRegistry, NormalizedMessage, PublicUrls},
    domain::{AttachedFiles, Message, MessageCreated, MessageFormat, Part},
    error::{PipelineError, PipelineResult, ProcessingError, ValidationError},
    ports::{
        MessageEventPublisher, MessageRepository, PartValidator, PendingBatch,
        PendingMessageHandler,
    },
    validation::DefaultPartValidator,
};
use crate::paging::{Cursor, Page, PageRequest, SortDirection};

/// Inputs of one send operation.
#[derive(Debug, Clone)]
pub struct SendMessageRequest {
    /// Project owning the session.
    pub project_id: ProjectId,
    /// Target session.
    pub session_id: SessionId,
    /// Role applied when the body does not carry one.
    pub role: Option<String>,
    /// Wire format selector; absent means the default dialect.
    pub format: Option<String>,
    /// Raw wire message.
    pub body: Value,
    /// Multipart payloads keyed by field name.
    pub files: AttachedFiles,
}

impl SendMessageRequest {
    /// Creates a request with no role override, default format, and no files.
    #[must_use]
    pub fn new(project_id: ProjectId, session_id: SessionId, body: Value) -> Self {
        Self {
            project_id,
            session_id,
            role: None,
            format: None,
            body,
            files: AttachedFiles::new(),
        }
    }

    /// Sets the role used when the body has none.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Sets the wire format selector.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Sets the attached multipart payloads.
    #[must_use]
    pub fn with_files(mut self, files: AttachedFiles) -> Self {
        self.files = files;
        self
    }
}

/// Inputs of one read operation.
#[derive(Debug, Clone, Default)]
pub struct GetMessagesRequest {
    /// Session to list.
    pub session_id: SessionId,
    /// Page size; absent means the configured default.
    pub limit: Option<usize>,
    /// Opaque cursor from a previous page.
    pub cursor: Option<String>,
    /// List newest first when `true`.
    pub time_desc: bool,
    /// Output format selector; absent means the default dialect.
    pub format: Option<String>,
    /// Resolve presigned URLs for part attachments.
    pub with_public_urls: bool,
    /// Lifetime of presigned URLs; absent means the configured TTL.
    pub asset_expire: Option<Duration>,
}

impl GetMessagesRequest {
    /// Creates a request for the first page in ascending order.
    #[must_use]
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            ..Self::default()
        }
    }

    /// Sets the page size.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Continues after `cursor`.
    #[must_use]
    pub fn after(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Lists newest first.
    #[must_use]
    pub const fn newest_first(mut self) -> Self {
        self.time_desc = true;
        self
    }

    /// Sets the output format selector.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Requests presigned URLs for attachments.
    #[must_use]
    pub const fn with_public_urls(mut self) -> Self {
        self.with_public_urls = true;
        self
    }

    /// Sets how long presigned URLs stay valid.
    #[must_use]
    pub const fn with_asset_expire(mut self, ttl: Duration) -> Self {
        self.asset_expire = Some(ttl);
        self
    }
}

/// One page of rendered messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetMessagesOutput {
    /// Messages rendered in the requested format.
    pub items: Vec<Value>,
    /// Identifiers of `items`, in the same order.
    pub ids: Vec<MessageId>,
    /// Cursor for the following page, when one exists.
    pub next_cursor: Option<String>,
    /// Whether another page follows.
    pub has_more: bool,
    /// Presigned URLs keyed by content hash.
    pub public_urls: PublicUrls,
}

/// Coordinates normalization, asset storage, persistence, and notification.
///
/// # Example
///
/// ```ignore
/// use colloquy::message::services::{MessagePipeline, SendMessageRequest};
///
/// let pipeline = MessagePipeline::new(repository, asset_store, publisher, clock, config);
/// let message = pipeline
///     .send_message(SendMessageRequest::new(project_id, session_id, body))
///     .await?;
/// ```
pub struct MessagePipeline<M, O, P, C>
where
    M: MessageRepository,
    O: ObjectStore,
    P: MessageEventPublisher,
    C: Clock + Send + Sync,
{
    repository: Arc<M>,
    assets: AssetStore<O>,
    publisher: Arc<P>,
    clock: Arc<C>,
    codecs: CodecRegistry,
    validator: Arc<dyn PartValidator>,
    config: StoreConfig,
}

impl<M, O, P, C> MessagePipeline<M, O, P, C>
where
    M: MessageRepository,
    O: ObjectStore,
    P: MessageEventPublisher,
    C: Clock + Send + Sync,
{
    /// Creates a pipeline with the standard codecs and the default validator
    /// configured from `config`.
    #[must_use]
    pub fn new(
        repository: Arc<M>,
        assets: AssetStore<O>,
        publisher: Arc<P>,
        clock: Arc<C>,
        config: StoreConfig,
    ) -> Self {
        Self {
            repository,
            assets,
            publisher,
            clock,
            codecs: CodecRegistry::standard(),
            validator: Arc::new(DefaultPartValidator::with_config(config.validation)),
            config,
        }
    }

    /// Replaces the codec registry.
    #[must_use]
    pub fn with_codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }

    /// Replaces the part validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn PartValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Normalizes, stores, and persists one inbound message.
    ///
    /// Every attachment and the parts blob are uploaded before the database
    /// transaction opens, so a failed upload leaves no row behind. Once the
    /// row commits, the notification is attempted with a bounded wait and
    /// its failure is only logged.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Validation`] for malformed input or missing
    /// attachments, [`PipelineError::SessionNotFound`] when the session is
    /// not in the project, [`PipelineError::Storage`] when an upload fails,
    /// and [`PipelineError::Repository`] when the commit fails.
    pub async fn send_message(&self, request: SendMessageRequest) -> PipelineResult<Message> {
        let SendMessageRequest {
            project_id,
            session_id,
            role,
            format,
            mut body,
            files,
        } = request;

        let codec = self.codecs.get(MessageFormat::resolve(format.as_deref())?)?;
        apply_default_role(&mut body, role);
        let normalized = codec.normalize_incoming(&body, self.validator.as_ref())?;

        if !self.repository.session_exists(project_id, session_id).await? {
            return Err(PipelineError::SessionNotFound(session_id));
        }

        let NormalizedMessage {
            role: message_role,
            parts: normalized_parts,
            meta,
            inline_files,
        } = normalized;
        let mut attachments = files;
        attachments.absorb(inline_files)?;

        let parts = self
            .store_attachments(project_id, normalized_parts, &attachments)
            .await?;
        let parts_asset = self
            .assets
            .upload_json(&self.config.parts_namespace(project_id), &parts)
            .await?;

        let pending = Message::new(
            session_id,
            message_role,
            parts,
            parts_asset.clone(),
            self.clock.as_ref(),
        )
        .with_meta(meta);
        let mut referenced = vec![parts_asset];
        referenced.extend(pending.part_assets());

        let message = self
            .repository
            .create(project_id, &pending, &referenced)
            .await?;
        info!(
            %project_id,
            %session_id,
            message_id = %message.id(),
            role = %message.role(),
            parts = message.parts().len(),
            "message created"
        );

        self.notify(MessageCreated {
            project_id,
            session_id,
            message_id: message.id(),
        })
        .await;
        Ok(message)
    }

    /// Lists one page of a session's messages in the requested format.
    ///
    /// A message whose parts blob cannot be read is returned with empty
    /// parts; a presign failure drops only that URL.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Validation`] for an unknown format, a bad
    /// limit, or a foreign cursor, and [`PipelineError::Repository`] when
    /// the listing query fails.
    pub async fn get_messages(
        &self,
        request: GetMessagesRequest,
    ) -> PipelineResult<GetMessagesOutput> {
        let codec = self
            .codecs
            .get(MessageFormat::resolve(request.format.as_deref())?)?;
        let limit = self
            .config
            .page_limits
            .resolve(request.limit)
            .map_err(ValidationError::from)?;
        let cursor =
            Cursor::decode_optional(request.cursor.as_deref()).map_err(ValidationError::from)?;
        let page_request =
            PageRequest::first(limit, SortDirection::from_time_desc(request.time_desc))
                .after(cursor);

        let rows = self
            .repository
            .list_page(request.session_id, &page_request)
            .await?;
        let page = Page::from_fetched(rows, limit, Message::cursor_key);

        let mut messages = Vec::with_capacity(page.items.len());
        for message in page.items {
            messages.push(self.load_parts(message).await);
        }

        let public_urls = if request.with_public_urls {
            let ttl = request.asset_expire.unwrap_or(self.config.presign_ttl);
            self.presign_parts(&messages, ttl).await
        } else {
            PublicUrls::new()
        };

        Ok(GetMessagesOutput {
            items: messages
                .iter()
                .map(|message| codec.convert_outgoing(message, &public_urls))
                .collect(),
            ids: messages.iter().map(Message::id).collect(),
            next_cursor: page.next_cursor,
            has_more: page.has_more,
            public_urls,
        })
    }

    /// Claims the session's pending messages for a task worker.
    ///
    /// Claimed messages move to running and come back oldest first with
    /// their parts loaded, together with up to `context` earlier messages.
    /// When the context cannot be read the claim is released again.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Repository`] when the claim or the context
    /// query fails.
    pub async fn claim_pending(
        &self,
        session_id: SessionId,
        context: usize,
    ) -> PipelineResult<PendingBatch> {
        let claimed = self.repository.claim_pending(session_id).await?;
        let Some(first) = claimed.first().map(Message::cursor_key) else {
            return Ok(PendingBatch {
                session_id,
                messages: Vec::new(),
                previous: Vec::new(),
            });
        };

        let previous = match self.previous_messages(session_id, first, context).await {
            Ok(previous) => previous,
            Err(err) => {
                let ids: Vec<MessageId> = claimed.iter().map(Message::id).collect();
                self.repository.release_to_pending(&ids).await?;
                return Err(err);
            }
        };

        let mut messages = Vec::with_capacity(claimed.len());
        for message in claimed {
            messages.push(self.load_parts(message).await);
        }
        debug!(%session_id, claimed = messages.len(), "pending messages claimed");
        Ok(PendingBatch {
            session_id,
            messages,
            previous,
        })
    }

    /// Moves claimed messages back to pending.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Repository`] when the update fails.
    pub async fn release_pending(&self, ids: &[MessageId]) -> PipelineResult<usize> {
        Ok(self.repository.release_to_pending(ids).await?)
    }

    /// Claims the session's pending messages and hands them to `handler`.
    ///
    /// Returns the number of messages processed; nothing is claimed and the
    /// handler is not called when no message is pending. A failed run
    /// releases the whole batch back to pending.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::Worker`] when the handler fails and
    /// [`ProcessingError::Pipeline`] when claiming or releasing fails.
    pub async fn process_pending<H>(
        &self,
        session_id: SessionId,
        context: usize,
        handler: &H,
    ) -> Result<usize, ProcessingError<H::Error>>
    where
        H: PendingMessageHandler,
    {
        let batch = self.claim_pending(session_id, context).await?;
        if batch.is_empty() {
            return Ok(0);
        }

        match handler.handle(&batch).await {
            Ok(()) => {
                info!(%session_id, processed = batch.messages.len(), "pending messages processed");
                Ok(batch.messages.len())
            }
            Err(source) => {
                warn!(
                    %session_id,
                    error = %source,
                    claimed = batch.messages.len(),
                    "task worker failed, releasing messages"
                );
                let released = self.release_pending(&batch.ids()).await?;
                Err(ProcessingError::Worker { source, released })
            }
        }
    }

    async fn previous_messages(
        &self,
        session_id: SessionId,
        before: Cursor,
        context: usize,
    ) -> PipelineResult<Vec<Message>> {
        if context == 0 {
            return Ok(Vec::new());
        }
        let request = PageRequest::first(context, SortDirection::Descending).after(Some(before));
        let mut rows = self.repository.list_page(session_id, &request).await?;
        rows.truncate(context);
        rows.reverse();

        let mut previous = Vec::with_capacity(rows.len());
        for message in rows {
            previous.push(self.load_parts(message).await);
        }
        Ok(previous)
    }

    async fn store_attachments(
        &self,
        project_id: ProjectId,
        mut parts: Vec<Part>,
        attachments: &AttachedFiles,
    ) -> PipelineResult<Vec<Part>> {
        if let Some(missing) = parts
            .iter()
            .filter_map(|part| part.file_field.as_deref())
            .find(|field| attachments.resolve(field).is_none())
        {
            return Err(ValidationError::MissingAttachment {
                field: missing.to_owned(),
            }
            .into());
        }

        let namespace = self.config.asset_namespace(project_id);
        let mut uploaded: HashMap<String, Asset> = HashMap::new();
        for part in &mut parts {
            let Some(field) = part.file_field.take() else {
                continue;
            };
            let Some(file) = attachments.resolve(&field) else {
                return Err(ValidationError::MissingAttachment { field }.into());
            };

            if part.filename.is_none() {
                part.filename.clone_from(&file.filename);
            }
            let asset = if let Some(existing) = uploaded.get(&field) {
                existing.clone()
            } else {
                let mime = AssetStore::<O>::resolve_mime(
                    file.content_type.as_deref(),
                    part.filename.as_deref(),
                );
                let stored = self
                    .assets
                    .upload(&namespace, file.bytes.clone(), &mime)
                    .await?;
                debug!(%field, key = %stored.key, "attachment stored");
                uploaded.insert(field, stored.clone());
                stored
            };
            part.asset = Some(asset);
        }
        Ok(parts)
    }

    async fn load_parts(&self, message: Message) -> Message {
        let key = &message.parts_asset().key;
        let parts = self
            .assets
            .download_json::<Vec<Part>>(key)
            .await
            .unwrap_or_else(|err| {
                warn!(
                    message_id = %message.id(),
                    %key,
                    error = %err,
                    "parts blob unreadable, returning message without parts"
                );
                Vec::new()
            });
        message.with_parts(parts)
    }

    async fn presign_parts(&self, messages: &[Message], ttl: Duration) -> PublicUrls {
        let expire_at = expiry(self.clock.utc(), ttl);
        let mut urls = PublicUrls::new();

        for asset in messages.iter().flat_map(Message::part_assets) {
            if urls.contains_key(&asset.sha256) {
                continue;
            }
            match self.assets.presign_get(&asset.key, ttl).await {
                Ok(url) => {
                    urls.insert(asset.sha256, PublicUrl { url, expire_at });
                }
                Err(err) => {
                    warn!(key = %asset.key, error = %err, "failed to presign attachment");
                }
            }
        }
        urls
    }

    async fn notify(&self, event: MessageCreated) {
        let outcome =
            tokio::time::timeout(self.config.publish_timeout, self.publisher.publish(&event))
                .await;
        match outcome {
            Ok(Ok(())) => debug!(
                topic = MessageCreated::TOPIC,
                message_id = %event.message_id,
                "message notification published"
            ),
            Ok(Err(err)) => warn!(
                topic = MessageCreated::TOPIC,
                message_id = %event.message_id,
                error = %err,
                "failed to publish message notification"
            ),
            Err(_) => warn!(
                topic = MessageCreated::TOPIC,
                message_id = %event.message_id,
                timeout_ms = self.config.publish_timeout.as_millis(),
                "timed out publishing message notification"
            ),
        }
    }
}

/// Inserts `role` into an object body that does not name one.
fn apply_default_role(body: &mut Value, role: Option<String>) {
    let (Some(object), Some(default_role)) = (body.as_object_mut(), role) else {
        return;
    };
    object
        .entry("role")
        .or_insert_with(|| Value::String(default_role));
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case::fills_missing(json!({"content": "hi"}), Some("user"), json!({"content": "hi", "role": "user"}))]
    #[case::keeps_existing(json!({"role": "assistant"}), Some("user"), json!({"role": "assistant"}))]
    #[case::no_default(json!({"content": "hi"}), None, json!({"content": "hi"}))]
    #[case::non_object(json!("hi"), Some("user"), json!("hi"))]
    fn default_role_only_fills_gaps(
        #[case] body: Value,
        #[case] role: Option<&str>,
        #[case] expected: Value,
    ) {
        let mut patched = body;
        apply_default_role(&mut patched, role.map(str::to_owned));
        assert_eq!(patched, expected);
    }

    #[rstest]
    fn expiry_saturates_instead_of_overflowing() {
        let now = Utc::now();
        assert_eq!(
            expiry(now, Duration::from_secs(60)),
            now + TimeDelta::seconds(60)
        );
        assert_eq!(
            expiry(now, Duration::MAX),
            DateTime::<Utc>::MAX_UTC
        );
    }
}
