//! Send-path behaviour: validation, parent links, and notifications.

use super::helpers::{Store, store};
use colloquy::asset::{adapters::InMemoryObjectStore, services::AssetStore};
use colloquy::ids::{ProjectId, SessionId};
use colloquy::message::{
    domain::{AttachedFile, AttachedFiles, PartType, Role},
    error::{PipelineError, ValidationError},
    services::{GetMessagesRequest, SendMessageRequest},
};
use rstest::rstest;
use serde_json::{Value, json};

fn tool_call_body(block: Value) -> Value {
    json!({"role": "assistant", "parts": [block]})
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tool_calls_need_an_identifier(store: Store) {
    let (project, session) = store.create_session().await;
    let function = json!({"name": "lookup", "arguments": "{\"q\":\"rust\"}"});

    let rejected = store
        .pipeline
        .send_message(
            SendMessageRequest::new(
                project,
                session,
                tool_call_body(json!({"type": "tool_call", "function": function})),
            )
            .with_format("openai"),
        )
        .await;
    assert!(matches!(
        rejected,
        Err(PipelineError::Validation(ValidationError::MissingPartField { field: "id", .. }))
    ));
    assert!(store.messages.is_empty());

    let accepted = store
        .pipeline
        .send_message(
            SendMessageRequest::new(
                project,
                session,
                tool_call_body(json!({"type": "tool_call", "id": "call-1", "function": function})),
            )
            .with_format("openai"),
        )
        .await
        .expect("tool call with an id is valid");

    assert_eq!(accepted.role(), Role::Assistant);
    let kinds: Vec<PartType> = accepted.parts().iter().map(|part| part.kind).collect();
    assert_eq!(kinds, vec![PartType::ToolCall]);
    assert_eq!(store.messages.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn each_message_points_at_the_previous_one(store: Store) {
    let (project, session) = store.create_session().await;

    let first = store.send_text(project, session, "one").await;
    let second = store.send_text(project, session, "two").await;
    let third = store.send_text(project, session, "three").await;

    assert_eq!(first.parent_id(), None);
    assert_eq!(second.parent_id(), Some(first.id()));
    assert_eq!(third.parent_id(), Some(second.id()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sessions_of_other_projects_are_not_found(store: Store) {
    let (_, session) = store.create_session().await;

    let result = store
        .pipeline
        .send_message(SendMessageRequest::new(
            ProjectId::new(),
            session,
            json!({"role": "user", "content": "hello"}),
        ))
        .await;

    assert!(matches!(result, Err(PipelineError::SessionNotFound(id)) if id == session));
    assert!(store.objects.is_empty(), "nothing is uploaded for a foreign session");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_formats_are_rejected(store: Store) {
    let (project, session) = store.create_session().await;

    let result = store
        .pipeline
        .send_message(
            SendMessageRequest::new(project, session, json!({"role": "user", "content": "x"}))
                .with_format("OpenAI"),
        )
        .await;

    assert!(matches!(
        result,
        Err(PipelineError::Validation(ValidationError::UnsupportedFormat(_)))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unresolved_file_fields_store_nothing(store: Store) {
    let (project, session) = store.create_session().await;
    let body = json!({
        "role": "user",
        "parts": [{"type": "image", "file_field": "missing"}]
    });

    let result = store
        .pipeline
        .send_message(SendMessageRequest::new(project, session, body).with_format("canonical"))
        .await;

    assert!(matches!(
        result,
        Err(PipelineError::Validation(ValidationError::MissingAttachment { ref field }))
            if field == "missing"
    ));
    assert!(store.objects.is_empty());
    assert!(store.messages.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn request_role_fills_a_body_without_one(store: Store) {
    let (project, session) = store.create_session().await;

    let message = store
        .pipeline
        .send_message(
            SendMessageRequest::new(project, session, json!({"content": "from the system"}))
                .with_role("system"),
        )
        .await
        .expect("role comes from the request");

    assert_eq!(message.role(), Role::System);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn subscribers_hear_about_committed_messages(store: Store) {
    let (project, session) = store.create_session().await;
    let mut events = store.publisher.subscribe();

    let message = store.send_text(project, session, "ping").await;

    let event = events.recv().await.expect("event is delivered");
    assert_eq!(event.message_id, message.id());
    assert_eq!(event.session_id, session);
    assert_eq!(event.project_id, project);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn messages_commit_without_any_subscriber(store: Store) {
    let (project, session) = store.create_session().await;

    store.send_text(project, session, "nobody listens").await;

    let page = store
        .pipeline
        .get_messages(GetMessagesRequest::new(session))
        .await
        .expect("listing");
    assert_eq!(page.items.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stored_messages_render_in_every_format(store: Store) {
    let (project, session) = store.create_session().await;
    store.send_text(project, session, "hello there").await;

    for format in ["canonical", "openai", "anthropic"] {
        let page = store
            .pipeline
            .get_messages(GetMessagesRequest::new(session).with_format(format))
            .await
            .expect("listing");
        let rendered = page.items.first().expect("one message").to_string();
        assert!(rendered.contains("hello there"), "{format}: {rendered}");
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn listing_an_unknown_session_is_empty(store: Store) {
    let page = store
        .pipeline
        .get_messages(GetMessagesRequest::new(SessionId::new()))
        .await
        .expect("listing");

    assert!(page.items.is_empty());
    assert!(!page.has_more);
    assert!(page.next_cursor.is_none());
}

#[rstest]
#[case::canonical_part("canonical")]
#[case::openai_data_block("openai")]
#[case::anthropic_data_block("anthropic")]
#[tokio::test(flavor = "multi_thread")]
async fn parts_cannot_name_an_existing_asset(store: Store, #[case] format: &str) {
    let (owner, owner_session) = store.create_session().await;
    let (intruder, intruder_session) = store.create_session().await;
    let files = AttachedFiles::new().with(
        "photo",
        AttachedFile::new(b"private pixels".to_vec()).with_content_type("image/png"),
    );
    let original = store
        .pipeline
        .send_message(
            SendMessageRequest::new(
                owner,
                owner_session,
                json!({"role": "user", "parts": [{"type": "image", "file_field": "photo"}]}),
            )
            .with_format("canonical")
            .with_files(files),
        )
        .await
        .expect("owner stores a picture");
    let asset = original.part_assets().first().cloned().expect("stored asset");
    let forged = json!({"type": "image", "asset": asset});
    let body = if format == "canonical" {
        json!({"role": "user", "parts": [forged]})
    } else {
        json!({"role": "user", "content": [{"type": "data", "part": forged}]})
    };

    let result = store
        .pipeline
        .send_message(
            SendMessageRequest::new(intruder, intruder_session, body).with_format(format),
        )
        .await;

    assert!(
        matches!(
            result,
            Err(PipelineError::Validation(ValidationError::InvalidPart { index: 0, .. }))
        ),
        "{result:?}"
    );
    assert_eq!(store.messages.len(), 1);
    assert_eq!(store.ref_count(intruder, &asset.sha256).await, None);
    assert_eq!(store.ref_count(owner, &asset.sha256).await, Some(1));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn client_fields_cannot_shadow_inline_payloads(store: Store) {
    let (project, session) = store.create_session().await;
    let files = AttachedFiles::new().with("inline-0", AttachedFile::new(b"substitute".to_vec()));
    let body = json!({
        "role": "user",
        "content": [{"type": "image_url", "image_url": {"url": "data:image/png;base64,aGVsbG8="}}]
    });

    let result = store
        .pipeline
        .send_message(
            SendMessageRequest::new(project, session, body.clone())
                .with_format("openai")
                .with_files(files),
        )
        .await;

    assert!(matches!(
        result,
        Err(PipelineError::Validation(ValidationError::ReservedField { ref field }))
            if field == "inline-0"
    ));
    assert!(store.objects.is_empty());
    assert!(store.messages.is_empty());

    let stored = store
        .pipeline
        .send_message(SendMessageRequest::new(project, session, body).with_format("openai"))
        .await
        .expect("inline payload alone is stored");
    let sha = stored.part_assets().first().map(|asset| asset.sha256.clone());
    assert_eq!(
        sha,
        Some(AssetStore::<InMemoryObjectStore>::content_hash(b"hello"))
    );
}
