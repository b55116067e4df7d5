//! Behaviour tests for the message send and read paths.

#[path = "message_pipeline_steps/mod.rs"]
mod message_pipeline_steps_defs;

use message_pipeline_steps_defs::world::{PipelineWorld, world};
use rstest_bdd_macros::scenario;

#[scenario(
    path = "tests/features/message_pipeline.feature",
    name = "Reject a tool call without an identifier"
)]
#[tokio::test(flavor = "multi_thread")]
async fn reject_tool_call_without_id(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/message_pipeline.feature",
    name = "Store a tool call with an identifier"
)]
#[tokio::test(flavor = "multi_thread")]
async fn store_tool_call_with_id(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/message_pipeline.feature",
    name = "Page through a session one message at a time"
)]
#[tokio::test(flavor = "multi_thread")]
async fn page_one_message_at_a_time(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/message_pipeline.feature",
    name = "Count every reference to a shared attachment"
)]
#[tokio::test(flavor = "multi_thread")]
async fn count_shared_attachment_references(world: PipelineWorld) {
    let _ = world;
}
