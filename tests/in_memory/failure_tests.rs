//! Storage failures abort the send before anything is committed.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use colloquy::asset::{
    error::{StorageError, StorageResult},
    ports::{AssetReferenceRepository, ObjectStore, StoredObject},
    services::AssetStore,
};
use colloquy::ids::{ProjectId, SessionId};
use colloquy::message::{
    domain::{AttachedFile, AttachedFiles},
    error::PipelineError,
    services::SendMessageRequest,
};
use mockall::mock;
use rstest::rstest;
use serde_json::json;

use super::helpers::Store;

mock! {
    pub Objects {}

    #[async_trait]
    impl ObjectStore for Objects {
        async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
            -> StorageResult<StoredObject>;
        async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;
        async fn presign_get(&self, key: &str, ttl: Duration) -> StorageResult<String>;
    }
}

fn stored(key: &str) -> StoredObject {
    StoredObject {
        bucket: "mock".to_owned(),
        key: key.to_owned(),
        etag: "etag".to_owned(),
    }
}

fn picture_request(project: ProjectId, session: SessionId) -> SendMessageRequest {
    let body = json!({
        "role": "user",
        "parts": [
            {"type": "text", "text": "see attached"},
            {"type": "image", "file_field": "img"}
        ]
    });
    SendMessageRequest::new(project, session, body)
        .with_format("canonical")
        .with_files(AttachedFiles::new().with("img", AttachedFile::new(b"png".to_vec())))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_attachment_upload_writes_no_row() {
    let mut objects = MockObjects::new();
    objects
        .expect_put()
        .times(1)
        .returning(|_, _, _| Err(StorageError::Io(io::Error::other("disk full"))));
    let store = Store::with_objects(objects);
    let (project, session) = store.create_session().await;

    let result = store
        .pipeline
        .send_message(picture_request(project, session))
        .await;

    assert!(matches!(result, Err(PipelineError::Storage(StorageError::Io(_)))));
    assert!(store.messages.is_empty());
    let unreferenced = store
        .references
        .list_unreferenced(project)
        .await
        .expect("reference listing");
    assert!(unreferenced.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_parts_upload_writes_no_row_or_count() {
    let mut objects = MockObjects::new();
    let mut calls = 0_u32;
    objects.expect_put().times(2).returning(move |key, _, _| {
        calls += 1;
        if calls == 1 {
            Ok(stored(key))
        } else {
            Err(StorageError::Io(io::Error::other("bucket gone")))
        }
    });
    let store = Store::with_objects(objects);
    let (project, session) = store.create_session().await;

    let result = store
        .pipeline
        .send_message(picture_request(project, session))
        .await;

    assert!(matches!(result, Err(PipelineError::Storage(_))));
    assert!(store.messages.is_empty());
    let sha = AssetStore::<MockObjects>::content_hash(b"png");
    assert_eq!(store.ref_count(project, &sha).await, None);
}
