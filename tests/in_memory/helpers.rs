//! Shared wiring for in-memory integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use colloquy::asset::{
    adapters::{InMemoryAssetReferenceRepository, InMemoryObjectStore},
    ports::{AssetReferenceRepository, ObjectStore},
    services::AssetStore,
};
use colloquy::config::StoreConfig;
use colloquy::ids::{MessageId, ProjectId, SessionId};
use colloquy::message::{
    adapters::{BroadcastEventPublisher, InMemoryMessageRepository},
    domain::Message,
    services::{GetMessagesRequest, MessagePipeline, SendMessageRequest},
};
use colloquy::persistence::memory::InMemoryDatabase;
use colloquy::session::{adapters::InMemorySessionRepository, domain::Session, ports::SessionRepository};
use mockable::Clock;
use rstest::fixture;
use serde_json::{Map, json};

/// Clock that moves forward by one millisecond on every reading.
///
/// Keeps creation timestamps strictly increasing so ordering assertions do
/// not depend on wall-clock resolution.
#[derive(Debug)]
pub struct TickingClock {
    start: DateTime<Utc>,
    ticks: AtomicI64,
}

impl Default for TickingClock {
    fn default() -> Self {
        Self {
            start: Utc
                .with_ymd_and_hms(2026, 5, 1, 8, 0, 0)
                .single()
                .expect("valid timestamp"),
            ticks: AtomicI64::new(0),
        }
    }
}

impl Clock for TickingClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.start + TimeDelta::milliseconds(tick)
    }
}

/// Pipeline over in-memory adapters and a caller-chosen object store.
pub type Pipeline<O> =
    MessagePipeline<InMemoryMessageRepository, O, BroadcastEventPublisher, TickingClock>;

/// Everything a scenario needs, sharing one in-memory database.
pub struct Store<O: ObjectStore = InMemoryObjectStore> {
    pub database: InMemoryDatabase,
    pub objects: Arc<O>,
    pub messages: Arc<InMemoryMessageRepository>,
    pub references: InMemoryAssetReferenceRepository,
    pub publisher: Arc<BroadcastEventPublisher>,
    pub pipeline: Pipeline<O>,
}

impl<O: ObjectStore> Store<O> {
    /// Wires a store around `objects`.
    pub fn with_objects(objects: O) -> Self {
        let database = InMemoryDatabase::new();
        let objects = Arc::new(objects);
        let messages = Arc::new(InMemoryMessageRepository::new(database.clone()));
        let publisher = Arc::new(BroadcastEventPublisher::default());
        let pipeline = MessagePipeline::new(
            Arc::clone(&messages),
            AssetStore::new(Arc::clone(&objects), Duration::from_secs(5)),
            Arc::clone(&publisher),
            Arc::new(TickingClock::default()),
            StoreConfig::default(),
        );
        Self {
            references: InMemoryAssetReferenceRepository::new(database.clone()),
            database,
            objects,
            messages,
            publisher,
            pipeline,
        }
    }

    /// Creates a session in a fresh project.
    pub async fn create_session(&self) -> (ProjectId, SessionId) {
        let session = Session::new(ProjectId::new(), None, Map::new(), &TickingClock::default());
        InMemorySessionRepository::new(self.database.clone())
            .create(&session)
            .await
            .expect("session should be created");
        (session.project_id(), session.id())
    }

    /// Sends a plain user text message in the default format.
    pub async fn send_text(&self, project: ProjectId, session: SessionId, text: &str) -> Message {
        self.pipeline
            .send_message(SendMessageRequest::new(
                project,
                session,
                json!({"role": "user", "content": text}),
            ))
            .await
            .expect("text message should be stored")
    }

    /// Walks every page of a session and returns the ids in listing order.
    ///
    /// `between_pages` runs after each page is read.
    pub async fn collect_ids<F, Fut>(
        &self,
        request: GetMessagesRequest,
        mut between_pages: F,
    ) -> Vec<MessageId>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut ids = Vec::new();
        let mut cursor = None;
        loop {
            let page = self
                .pipeline
                .get_messages(request.clone().after(cursor))
                .await
                .expect("page should load");
            ids.extend(page.ids);
            between_pages().await;
            if !page.has_more {
                return ids;
            }
            cursor = Some(page.next_cursor.expect("more pages need a cursor"));
        }
    }

    /// Returns the reference count of `sha256` in `project`.
    pub async fn ref_count(&self, project: ProjectId, sha256: &str) -> Option<i64> {
        self.references
            .ref_count(project, sha256)
            .await
            .expect("reference lookup")
    }
}

/// A store over the in-memory object store.
#[fixture]
pub fn store() -> Store {
    Store::with_objects(InMemoryObjectStore::default())
}
