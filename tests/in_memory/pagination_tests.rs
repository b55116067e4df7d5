//! Keyset pagination over session messages.

use super::helpers::{Store, store};
use colloquy::ids::MessageId;
use colloquy::message::{
    error::{PipelineError, ValidationError},
    services::GetMessagesRequest,
};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn single_item_pages_hand_over_with_a_cursor(store: Store) {
    let (project, session) = store.create_session().await;
    let first = store.send_text(project, session, "first").await;
    let second = store.send_text(project, session, "second").await;

    let page = store
        .pipeline
        .get_messages(GetMessagesRequest::new(session).with_limit(1))
        .await
        .expect("first page");
    assert_eq!(page.ids, vec![first.id()]);
    assert!(page.has_more);
    let cursor = page.next_cursor.expect("cursor for the second page");

    let rest = store
        .pipeline
        .get_messages(GetMessagesRequest::new(session).with_limit(1).after(Some(cursor)))
        .await
        .expect("second page");
    assert_eq!(rest.ids, vec![second.id()]);
    assert!(!rest.has_more);
    assert!(rest.next_cursor.is_none());
}

#[rstest]
#[case::one(1)]
#[case::two(2)]
#[case::exact(5)]
#[case::oversized(50)]
#[tokio::test(flavor = "multi_thread")]
async fn walking_pages_visits_every_message_once(store: Store, #[case] limit: usize) {
    let (project, session) = store.create_session().await;
    let mut sent = Vec::new();
    for n in 0..5 {
        sent.push(store.send_text(project, session, &format!("m{n}")).await.id());
    }

    let ascending = store
        .collect_ids(GetMessagesRequest::new(session).with_limit(limit), || async {})
        .await;
    assert_eq!(ascending, sent);

    let descending = store
        .collect_ids(
            GetMessagesRequest::new(session).with_limit(limit).newest_first(),
            || async {},
        )
        .await;
    let mut newest_first = sent.clone();
    newest_first.reverse();
    assert_eq!(descending, newest_first);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn ascending_walks_pick_up_messages_sent_mid_walk(store: Store) {
    let (project, session) = store.create_session().await;
    for n in 0..3 {
        store.send_text(project, session, &format!("early {n}")).await;
    }

    let mut late_messages = 1_u32;
    let store_ref = &store;
    let seen = store
        .collect_ids(GetMessagesRequest::new(session).with_limit(2), || {
            let send = late_messages > 0;
            late_messages = late_messages.saturating_sub(1);
            async move {
                if send {
                    store_ref.send_text(project, session, "late").await;
                }
            }
        })
        .await;

    let all = store
        .collect_ids(GetMessagesRequest::new(session).with_limit(100), || async {})
        .await;
    assert_eq!(all.len(), 4);
    assert_eq!(seen, all, "no message is skipped or repeated");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn descending_walks_ignore_messages_sent_mid_walk(store: Store) {
    let (project, session) = store.create_session().await;
    let mut original: Vec<MessageId> = Vec::new();
    for n in 0..4 {
        original.push(store.send_text(project, session, &format!("early {n}")).await.id());
    }

    let store_ref = &store;
    let seen = store
        .collect_ids(
            GetMessagesRequest::new(session).with_limit(2).newest_first(),
            || async move {
                store_ref.send_text(project, session, "late").await;
            },
        )
        .await;

    original.reverse();
    assert_eq!(seen, original);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cursors_must_be_well_formed(store: Store) {
    let (_, session) = store.create_session().await;

    let result = store
        .pipeline
        .get_messages(GetMessagesRequest::new(session).after(Some("%%%".to_owned())))
        .await;

    assert!(matches!(
        result,
        Err(PipelineError::Validation(ValidationError::InvalidCursor(_)))
    ));
}

#[rstest]
#[case::zero(0)]
#[case::above_max(201)]
#[tokio::test(flavor = "multi_thread")]
async fn limits_outside_the_bounds_are_rejected(store: Store, #[case] limit: usize) {
    let (_, session) = store.create_session().await;

    let result = store
        .pipeline
        .get_messages(GetMessagesRequest::new(session).with_limit(limit))
        .await;

    assert!(matches!(
        result,
        Err(PipelineError::Validation(ValidationError::InvalidLimit(_)))
    ));
}
