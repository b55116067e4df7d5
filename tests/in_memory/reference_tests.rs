//! Attachment deduplication, reference counts, and presigned URLs.

use super::helpers::{Store, store};
use colloquy::asset::services::AssetStore;
use colloquy::asset::adapters::InMemoryObjectStore;
use colloquy::ids::{ProjectId, SessionId};
use colloquy::message::{
    domain::{AttachedFile, AttachedFiles, Message},
    services::{GetMessagesRequest, SendMessageRequest},
};
use rstest::rstest;
use serde_json::json;
use std::time::Duration;

const PIXELS: &[u8] = b"\x89PNG not really an image";

async fn send_picture(store: &Store, project: ProjectId, session: SessionId, caption: &str) -> Message {
    let files = AttachedFiles::new().with(
        "picture",
        AttachedFile::new(PIXELS.to_vec())
            .with_filename("cat.png")
            .with_content_type("image/png"),
    );
    let body = json!({
        "role": "user",
        "parts": [
            {"type": "text", "text": caption},
            {"type": "image", "file_field": "picture"}
        ]
    });
    store
        .pipeline
        .send_message(
            SendMessageRequest::new(project, session, body)
                .with_format("canonical")
                .with_files(files),
        )
        .await
        .expect("picture message should be stored")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn identical_attachments_share_one_object_and_count_twice(store: Store) {
    let (project, session) = store.create_session().await;
    let sha = AssetStore::<InMemoryObjectStore>::content_hash(PIXELS);

    let first = send_picture(&store, project, session, "first look").await;
    let second = send_picture(&store, project, session, "second look").await;

    let first_asset = first.part_assets();
    let second_asset = second.part_assets();
    assert_eq!(first_asset, second_asset);
    assert_eq!(first_asset.first().map(|asset| asset.sha256.as_str()), Some(sha.as_str()));
    assert_eq!(store.ref_count(project, &sha).await, Some(2));

    // One image plus two distinct parts blobs.
    assert_eq!(store.objects.len(), 3);
    assert_eq!(
        store.ref_count(project, &first.parts_asset().sha256).await,
        Some(1)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn one_file_used_twice_in_a_message_counts_twice(store: Store) {
    let (project, session) = store.create_session().await;
    let files = AttachedFiles::new().with("doc", AttachedFile::new(b"%PDF-1.7".to_vec()));
    let body = json!({
        "role": "user",
        "parts": [
            {"type": "file", "file_field": "doc", "filename": "a.pdf"},
            {"type": "file", "file_field": "doc", "filename": "b.pdf"}
        ]
    });

    let message = store
        .pipeline
        .send_message(
            SendMessageRequest::new(project, session, body)
                .with_format("canonical")
                .with_files(files),
        )
        .await
        .expect("message with a repeated file");

    let sha = AssetStore::<InMemoryObjectStore>::content_hash(b"%PDF-1.7");
    assert_eq!(message.part_assets().len(), 2);
    assert_eq!(store.ref_count(project, &sha).await, Some(2));
    let mime = message
        .part_assets()
        .first()
        .map(|asset| asset.mime.clone());
    assert_eq!(mime.as_deref(), Some("application/pdf"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn counts_are_kept_per_project(store: Store) {
    let (project_a, session_a) = store.create_session().await;
    let (project_b, session_b) = store.create_session().await;
    let sha = AssetStore::<InMemoryObjectStore>::content_hash(PIXELS);

    send_picture(&store, project_a, session_a, "a").await;
    send_picture(&store, project_b, session_b, "b").await;

    assert_eq!(store.ref_count(project_a, &sha).await, Some(1));
    assert_eq!(store.ref_count(project_b, &sha).await, Some(1));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stored_parts_keep_their_asset_but_not_the_field(store: Store) {
    let (project, session) = store.create_session().await;
    send_picture(&store, project, session, "look").await;

    let page = store
        .pipeline
        .get_messages(GetMessagesRequest::new(session).with_format("canonical"))
        .await
        .expect("listing");
    let image = page
        .items
        .first()
        .and_then(|item| item.pointer("/parts/1"))
        .cloned()
        .expect("image part");

    assert!(image.get("file_field").is_none());
    assert_eq!(image.get("filename"), Some(&json!("cat.png")));
    assert_eq!(image.pointer("/asset/mime"), Some(&json!("image/png")));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn public_urls_are_keyed_by_content_hash(store: Store) {
    let (project, session) = store.create_session().await;
    send_picture(&store, project, session, "one").await;
    send_picture(&store, project, session, "two").await;
    let sha = AssetStore::<InMemoryObjectStore>::content_hash(PIXELS);

    let without = store
        .pipeline
        .get_messages(GetMessagesRequest::new(session))
        .await
        .expect("listing");
    assert!(without.public_urls.is_empty());

    let with = store
        .pipeline
        .get_messages(GetMessagesRequest::new(session).with_public_urls())
        .await
        .expect("listing with urls");
    assert_eq!(with.public_urls.len(), 1);
    let url = with.public_urls.get(&sha).expect("url for the picture");
    assert!(url.url.starts_with("memory://"), "{}", url.url);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unreadable_parts_blobs_yield_empty_parts(store: Store) {
    let (project, session) = store.create_session().await;
    let message = store.send_text(project, session, "soon gone").await;
    store.objects.evict(&message.parts_asset().key);

    let page = store
        .pipeline
        .get_messages(GetMessagesRequest::new(session).with_format("canonical"))
        .await
        .expect("listing survives a missing blob");

    assert_eq!(page.ids, vec![message.id()]);
    assert_eq!(
        page.items.first().and_then(|item| item.get("parts")),
        Some(&json!([]))
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn public_url_lifetime_follows_the_request(store: Store) {
    let (project, session) = store.create_session().await;
    send_picture(&store, project, session, "short lived").await;
    let sha = AssetStore::<InMemoryObjectStore>::content_hash(PIXELS);

    let configured = store
        .pipeline
        .get_messages(GetMessagesRequest::new(session).with_public_urls())
        .await
        .expect("listing with the configured lifetime");
    let short = store
        .pipeline
        .get_messages(
            GetMessagesRequest::new(session)
                .with_public_urls()
                .with_asset_expire(Duration::from_secs(60)),
        )
        .await
        .expect("listing with a one minute lifetime");

    let configured_url = configured.public_urls.get(&sha).expect("configured url");
    let short_url = short.public_urls.get(&sha).expect("short url");
    assert!(configured_url.url.ends_with("expires_in=86400"), "{}", configured_url.url);
    assert!(short_url.url.ends_with("expires_in=60"), "{}", short_url.url);
    assert!(short_url.expire_at < configured_url.expire_at);
}
