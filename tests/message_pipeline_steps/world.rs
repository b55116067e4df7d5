//! Shared world state for message pipeline BDD scenarios.

use std::sync::Arc;
use std::time::Duration;

use colloquy::asset::{
    adapters::{InMemoryAssetReferenceRepository, InMemoryObjectStore},
    services::AssetStore,
};
use colloquy::config::StoreConfig;
use colloquy::ids::{ProjectId, SessionId};
use colloquy::message::{
    adapters::{BroadcastEventPublisher, InMemoryMessageRepository},
    domain::Message,
    error::PipelineResult,
    services::{GetMessagesOutput, MessagePipeline},
};
use colloquy::persistence::memory::InMemoryDatabase;
use mockable::DefaultClock;
use rstest::fixture;

/// Pipeline type used by the BDD world.
pub type TestPipeline = MessagePipeline<
    InMemoryMessageRepository,
    InMemoryObjectStore,
    BroadcastEventPublisher,
    DefaultClock,
>;

/// Scenario world for message pipeline behaviour tests.
pub struct PipelineWorld {
    pub database: InMemoryDatabase,
    pub messages: Arc<InMemoryMessageRepository>,
    pub references: InMemoryAssetReferenceRepository,
    pub pipeline: TestPipeline,
    pub project_id: ProjectId,
    pub session_id: Option<SessionId>,
    pub last_send: Option<PipelineResult<Message>>,
    pub last_page: Option<GetMessagesOutput>,
}

impl PipelineWorld {
    /// Creates a world with no session yet.
    #[must_use]
    pub fn new() -> Self {
        let database = InMemoryDatabase::new();
        let messages = Arc::new(InMemoryMessageRepository::new(database.clone()));
        let pipeline = MessagePipeline::new(
            Arc::clone(&messages),
            AssetStore::new(
                Arc::new(InMemoryObjectStore::default()),
                Duration::from_secs(5),
            ),
            Arc::new(BroadcastEventPublisher::default()),
            Arc::new(DefaultClock),
            StoreConfig::default(),
        );

        Self {
            references: InMemoryAssetReferenceRepository::new(database.clone()),
            database,
            messages,
            pipeline,
            project_id: ProjectId::new(),
            session_id: None,
            last_send: None,
            last_page: None,
        }
    }

    /// Returns the scenario session.
    pub fn session(&self) -> Result<SessionId, eyre::Report> {
        self.session_id
            .ok_or_else(|| eyre::eyre!("missing session in scenario world"))
    }
}

impl Default for PipelineWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> PipelineWorld {
    PipelineWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
