//! Then steps for message pipeline BDD scenarios.

use super::when::PICTURE;
use super::world::{PipelineWorld, run_async};
use colloquy::asset::{
    adapters::InMemoryObjectStore, ports::AssetReferenceRepository, services::AssetStore,
};
use colloquy::message::error::{PipelineError, ValidationError};
use eyre::WrapErr;
use rstest_bdd_macros::then;

#[then(r#"the send fails because part field "{field}" is missing"#)]
fn send_fails_missing_field(world: &PipelineWorld, field: String) -> Result<(), eyre::Report> {
    let result = world
        .last_send
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing send result"))?;

    match result {
        Err(PipelineError::Validation(ValidationError::MissingPartField {
            field: missing, ..
        })) if *missing == field => Ok(()),
        other => Err(eyre::eyre!("expected missing field {field}, got {other:?}")),
    }
}

#[then("the send succeeds")]
fn send_succeeds(world: &PipelineWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_send
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing send result"))?;
    match result {
        Ok(_) => Ok(()),
        Err(err) => Err(eyre::eyre!("expected success, got {err}")),
    }
}

#[then("the session holds {count:usize} messages")]
fn session_holds(world: &PipelineWorld, count: usize) -> Result<(), eyre::Report> {
    if world.messages.len() != count {
        return Err(eyre::eyre!(
            "expected {count} messages, found {}",
            world.messages.len()
        ));
    }
    Ok(())
}

fn check_page(world: &PipelineWorld, count: usize, more: bool) -> Result<(), eyre::Report> {
    let page = world
        .last_page
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing page"))?;
    if page.items.len() != count || page.has_more != more {
        return Err(eyre::eyre!(
            "expected {count} items with has_more={more}, got {} with has_more={}",
            page.items.len(),
            page.has_more
        ));
    }
    if page.next_cursor.is_some() != more {
        return Err(eyre::eyre!("cursor presence does not match has_more"));
    }
    Ok(())
}

#[then("the page holds {count:usize} message and more follow")]
fn page_with_more(world: &PipelineWorld, count: usize) -> Result<(), eyre::Report> {
    check_page(world, count, true)
}

#[then("the page holds {count:usize} message and nothing follows")]
fn page_without_more(world: &PipelineWorld, count: usize) -> Result<(), eyre::Report> {
    check_page(world, count, false)
}

#[then("the picture has {count:i64} references")]
fn picture_references(world: &PipelineWorld, count: i64) -> Result<(), eyre::Report> {
    let sha = AssetStore::<InMemoryObjectStore>::content_hash(PICTURE);
    let found = run_async(world.references.ref_count(world.project_id, &sha))
        .wrap_err("read reference count")?;
    if found != Some(count) {
        return Err(eyre::eyre!("expected {count} references, found {found:?}"));
    }
    Ok(())
}
