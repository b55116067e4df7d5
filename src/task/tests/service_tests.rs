//! Service orchestration tests for task storage and listing.

use std::sync::Arc;

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use rstest::{fixture, rstest};
use serde_json::{Map, json};

use crate::ids::{ProjectId, SessionId};
use crate::message::error::ValidationError;
use crate::paging::PageLimits;
use crate::persistence::{RepositoryError, memory::InMemoryDatabase};
use crate::session::{adapters::InMemorySessionRepository, domain::Session, ports::SessionRepository};
use crate::task::{
    adapters::InMemoryTaskRepository,
    domain::{Task, TaskId, TaskStatus},
    services::{TaskService, TaskServiceError},
};

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

struct Harness {
    session: Session,
    service: TaskService<InMemoryTaskRepository, FixedClock>,
}

impl Harness {
    fn task_at(&self, order: i32, offset_secs: i64) -> Task {
        Task::new(
            self.session.id(),
            self.session.project_id(),
            order,
            json!({"order": order}),
            &FixedClock(base_time() + Duration::seconds(offset_secs)),
        )
    }

    async fn store_tasks(&self, count: i32) -> Vec<Task> {
        let mut stored = Vec::new();
        for order in 0..count {
            let task = self.task_at(order, i64::from(order));
            self.service.store(&task).await.expect("task should be stored");
            stored.push(task);
        }
        stored
    }
}

#[fixture]
async fn harness() -> Harness {
    let database = InMemoryDatabase::new();
    let session = Session::new(ProjectId::new(), None, Map::new(), &FixedClock(base_time()));
    InMemorySessionRepository::new(database.clone())
        .create(&session)
        .await
        .expect("session should be created");

    let service = TaskService::new(
        Arc::new(InMemoryTaskRepository::new(database)),
        Arc::new(FixedClock(base_time() + Duration::hours(1))),
    )
    .with_page_limits(PageLimits {
        default_limit: 2,
        max_limit: 10,
    });
    Harness { session, service }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tasks_are_listed_newest_first_across_pages(#[future] harness: Harness) {
    let harness = harness.await;
    let stored = harness.store_tasks(3).await;

    let first = harness
        .service
        .get_tasks(harness.session.id(), None, None)
        .await
        .expect("first page");
    let orders: Vec<i32> = first.items.iter().map(Task::order).collect();
    assert_eq!(orders, vec![2, 1]);
    assert!(first.has_more);

    let second = harness
        .service
        .get_tasks(harness.session.id(), None, first.next_cursor.as_deref())
        .await
        .expect("second page");
    assert_eq!(second.items, stored.into_iter().take(1).collect::<Vec<_>>());
    assert!(!second.has_more);
    assert!(second.next_cursor.is_none());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tasks_of_other_sessions_are_not_listed(#[future] harness: Harness) {
    let harness = harness.await;
    harness.store_tasks(1).await;

    let page = harness
        .service
        .get_tasks(SessionId::new(), Some(10), None)
        .await
        .expect("empty listing");

    assert!(page.items.is_empty());
    assert!(!page.has_more);
}

#[rstest]
#[case::zero_limit(Some(0), None)]
#[case::above_max(Some(11), None)]
#[case::garbage_cursor(None, Some("not-a-cursor"))]
#[tokio::test(flavor = "multi_thread")]
async fn bad_listing_parameters_are_validation_errors(
    #[future] harness: Harness,
    #[case] limit: Option<usize>,
    #[case] cursor: Option<&str>,
) {
    let harness = harness.await;
    let result = harness
        .service
        .get_tasks(harness.session.id(), limit, cursor)
        .await;

    assert!(matches!(
        result,
        Err(TaskServiceError::Validation(
            ValidationError::InvalidLimit(_) | ValidationError::InvalidCursor(_)
        ))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn storing_for_a_missing_session_fails(#[future] harness: Harness) {
    let harness = harness.await;
    let orphan = Task::new(
        SessionId::new(),
        harness.session.project_id(),
        0,
        json!({}),
        &FixedClock(base_time()),
    );

    let result = harness.service.store(&orphan).await;

    assert!(matches!(
        result,
        Err(TaskServiceError::Repository(RepositoryError::SessionNotFound(_)))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn status_updates_are_persisted(#[future] harness: Harness) {
    let harness = harness.await;
    let task = harness.store_tasks(1).await.remove(0);

    let running = harness
        .service
        .update_status(task.id(), TaskStatus::Running)
        .await
        .expect("pending task can start");
    assert_eq!(running.updated_at(), base_time() + Duration::hours(1));

    let page = harness
        .service
        .get_tasks(harness.session.id(), None, None)
        .await
        .expect("listing");
    assert_eq!(page.items, vec![running]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn invalid_status_updates_are_domain_errors(#[future] harness: Harness) {
    let harness = harness.await;
    let task = harness.store_tasks(1).await.remove(0);

    let result = harness
        .service
        .update_status(task.id(), TaskStatus::Success)
        .await;

    assert!(matches!(result, Err(TaskServiceError::Domain(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn updating_an_unknown_task_is_not_found(#[future] harness: Harness) {
    let harness = harness.await;
    let missing = TaskId::new();

    let result = harness
        .service
        .update_status(missing, TaskStatus::Running)
        .await;

    assert!(matches!(result, Err(TaskServiceError::NotFound(id)) if id == missing));
}
