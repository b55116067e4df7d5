//! When steps for message pipeline BDD scenarios.

use super::world::{PipelineWorld, run_async};
use colloquy::message::{
    domain::{AttachedFile, AttachedFiles},
    services::{GetMessagesRequest, SendMessageRequest},
};
use eyre::WrapErr;
use rstest_bdd_macros::when;
use serde_json::{Value, json};

/// Bytes of the picture shared across messages.
pub const PICTURE: &[u8] = b"shared picture bytes";

fn send_tool_call(world: &mut PipelineWorld, block: Value) -> Result<(), eyre::Report> {
    let request = SendMessageRequest::new(
        world.project_id,
        world.session()?,
        json!({"role": "assistant", "parts": [block]}),
    )
    .with_format("openai");
    world.last_send = Some(run_async(world.pipeline.send_message(request)));
    Ok(())
}

#[when("an assistant sends an openai tool call without an id")]
fn tool_call_without_id(world: &mut PipelineWorld) -> Result<(), eyre::Report> {
    send_tool_call(
        world,
        json!({"type": "tool_call", "function": {"name": "search", "arguments": "{}"}}),
    )
}

#[when(r#"an assistant sends an openai tool call with id "{id}""#)]
fn tool_call_with_id(world: &mut PipelineWorld, id: String) -> Result<(), eyre::Report> {
    send_tool_call(
        world,
        json!({"type": "tool_call", "id": id, "function": {"name": "search", "arguments": "{}"}}),
    )
}

fn read_page(
    world: &mut PipelineWorld,
    limit: usize,
    cursor: Option<String>,
) -> Result<(), eyre::Report> {
    let request = GetMessagesRequest::new(world.session()?)
        .with_limit(limit)
        .after(cursor);
    let page = run_async(world.pipeline.get_messages(request)).wrap_err("read page")?;
    world.last_page = Some(page);
    Ok(())
}

#[when("the first page of {limit:usize} message is read")]
fn first_page(world: &mut PipelineWorld, limit: usize) -> Result<(), eyre::Report> {
    read_page(world, limit, None)
}

#[when("the next page of {limit:usize} message is read")]
fn next_page(world: &mut PipelineWorld, limit: usize) -> Result<(), eyre::Report> {
    let cursor = world
        .last_page
        .as_ref()
        .and_then(|page| page.next_cursor.clone())
        .ok_or_else(|| eyre::eyre!("previous page has no cursor"))?;
    read_page(world, limit, Some(cursor))
}

#[when("the same picture is sent {times:usize} times")]
fn same_picture(world: &mut PipelineWorld, times: usize) -> Result<(), eyre::Report> {
    let session_id = world.session()?;
    for _ in 0..times {
        let files = AttachedFiles::new().with(
            "pic",
            AttachedFile::new(PICTURE.to_vec()).with_content_type("image/jpeg"),
        );
        let request = SendMessageRequest::new(
            world.project_id,
            session_id,
            json!({"role": "user", "parts": [{"type": "image", "file_field": "pic"}]}),
        )
        .with_format("canonical")
        .with_files(files);
        run_async(world.pipeline.send_message(request)).wrap_err("send picture")?;
    }
    Ok(())
}
