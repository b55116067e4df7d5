//! Task worker hand-off: claiming pending messages, task status updates, and
//! release on failure.

use std::sync::{Arc, Mutex};

use super::helpers::{Store, TickingClock, store};
use async_trait::async_trait;
use colloquy::ids::{ProjectId, SessionId};
use colloquy::message::{
    domain::{Message, ProcessingStatus},
    error::ProcessingError,
    ports::{MessageRepository, PendingBatch, PendingMessageHandler},
};
use colloquy::task::{
    adapters::InMemoryTaskRepository,
    domain::{Task, TaskStatus},
    services::TaskService,
};
use rstest::rstest;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("task extraction failed")]
struct ExtractionFailed;

/// Records one task per batch and walks it through the status lifecycle.
struct TaskExtractor {
    project_id: ProjectId,
    tasks: TaskService<InMemoryTaskRepository, TickingClock>,
    fail: bool,
    batches: Mutex<Vec<PendingBatch>>,
}

impl TaskExtractor {
    fn new(store: &Store, project_id: ProjectId, fail: bool) -> Self {
        Self {
            project_id,
            tasks: TaskService::new(
                Arc::new(InMemoryTaskRepository::new(store.database.clone())),
                Arc::new(TickingClock::default()),
            ),
            fail,
            batches: Mutex::new(Vec::new()),
        }
    }

    fn batches(&self) -> Vec<PendingBatch> {
        self.batches.lock().expect("batch log").clone()
    }

    async fn only_task(&self, session_id: SessionId) -> Task {
        let page = self
            .tasks
            .get_tasks(session_id, None, None)
            .await
            .expect("task listing");
        assert_eq!(page.items.len(), 1);
        page.items.into_iter().next().expect("one task")
    }
}

#[async_trait]
impl PendingMessageHandler for TaskExtractor {
    type Error = ExtractionFailed;

    async fn handle(&self, batch: &PendingBatch) -> Result<(), Self::Error> {
        self.batches.lock().expect("batch log").push(batch.clone());
        let ids: Vec<String> = batch.ids().iter().map(ToString::to_string).collect();
        let task = Task::new(
            batch.session_id,
            self.project_id,
            1,
            json!({"messages": ids}),
            &TickingClock::default(),
        );
        self.tasks.store(&task).await.expect("task stored");
        self.tasks
            .update_status(task.id(), TaskStatus::Running)
            .await
            .expect("task starts");

        if self.fail {
            self.tasks
                .update_status(task.id(), TaskStatus::Failed)
                .await
                .expect("task fails");
            return Err(ExtractionFailed);
        }
        self.tasks
            .update_status(task.id(), TaskStatus::Success)
            .await
            .expect("task succeeds");
        Ok(())
    }
}

async fn status_of(store: &Store, message: &Message) -> ProcessingStatus {
    store
        .messages
        .find_by_id(message.id())
        .await
        .expect("lookup")
        .expect("stored message")
        .processing_status()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn pending_messages_feed_the_task_worker_once(store: Store) {
    let (project, session) = store.create_session().await;
    let first = store.send_text(project, session, "book a flight").await;
    let second = store.send_text(project, session, "and a hotel").await;
    assert_eq!(status_of(&store, &first).await, ProcessingStatus::Pending);
    let worker = TaskExtractor::new(&store, project, false);

    let processed = store
        .pipeline
        .process_pending(session, 1, &worker)
        .await
        .expect("run succeeds");
    let again = store
        .pipeline
        .process_pending(session, 1, &worker)
        .await
        .expect("nothing left to run");

    assert_eq!(processed, 2);
    assert_eq!(again, 0);
    let batches = worker.batches();
    assert_eq!(batches.len(), 1);
    let batch = batches.first().expect("one batch");
    assert_eq!(batch.ids(), vec![first.id(), second.id()]);
    assert!(batch.previous.is_empty());
    assert_eq!(
        batch
            .messages
            .first()
            .and_then(|message| message.parts().first())
            .and_then(|part| part.text.clone()),
        Some("book a flight".to_owned())
    );
    assert_eq!(status_of(&store, &second).await, ProcessingStatus::Running);
    assert_eq!(worker.only_task(session).await.status(), TaskStatus::Success);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_runs_release_messages_for_retry(store: Store) {
    let (project, session) = store.create_session().await;
    let message = store.send_text(project, session, "cancel my order").await;
    store.send_text(project, session, "order 42").await;
    let failing = TaskExtractor::new(&store, project, true);

    let result = store.pipeline.process_pending(session, 0, &failing).await;

    assert!(
        matches!(result, Err(ProcessingError::Worker { released: 2, .. })),
        "{result:?}"
    );
    assert_eq!(status_of(&store, &message).await, ProcessingStatus::Pending);
    assert_eq!(failing.only_task(session).await.status(), TaskStatus::Failed);

    let retry = TaskExtractor::new(&store, project, false);
    let processed = store
        .pipeline
        .process_pending(session, 0, &retry)
        .await
        .expect("retry succeeds");
    assert_eq!(processed, 2);
    assert_eq!(status_of(&store, &message).await, ProcessingStatus::Running);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn claims_carry_earlier_messages_as_context(store: Store) {
    let (project, session) = store.create_session().await;
    let worker = TaskExtractor::new(&store, project, false);
    store.send_text(project, session, "one").await;
    let two = store.send_text(project, session, "two").await;
    store
        .pipeline
        .process_pending(session, 0, &worker)
        .await
        .expect("first run");
    let three = store.send_text(project, session, "three").await;
    let four = store.send_text(project, session, "four").await;

    let batch = store
        .pipeline
        .claim_pending(session, 1)
        .await
        .expect("claim");

    assert_eq!(batch.ids(), vec![three.id(), four.id()]);
    let previous: Vec<_> = batch.previous.iter().map(Message::id).collect();
    assert_eq!(previous, vec![two.id()]);
    assert_eq!(
        batch
            .previous
            .first()
            .and_then(|message| message.parts().first())
            .and_then(|part| part.text.clone()),
        Some("two".to_owned())
    );

    let released = store
        .pipeline
        .release_pending(&[three.id(), two.id()])
        .await
        .expect("release");
    assert_eq!(released, 1, "only running messages go back to pending");
    assert_eq!(status_of(&store, &three).await, ProcessingStatus::Pending);
    assert_eq!(status_of(&store, &four).await, ProcessingStatus::Running);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sessions_are_claimed_independently(store: Store) {
    let (project, session) = store.create_session().await;
    let (_, other_session) = store.create_session().await;
    store.send_text(project, session, "mine").await;

    let batch = store
        .pipeline
        .claim_pending(other_session, 2)
        .await
        .expect("claim");

    assert!(batch.is_empty());
    assert_eq!(batch.session_id, other_session);
}
