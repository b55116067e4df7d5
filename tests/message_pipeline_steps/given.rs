//! Given steps for message pipeline BDD scenarios.

use super::world::{PipelineWorld, run_async};
use colloquy::message::services::SendMessageRequest;
use colloquy::session::{
    adapters::InMemorySessionRepository, domain::Session, ports::SessionRepository,
};
use eyre::WrapErr;
use mockable::DefaultClock;
use rstest_bdd_macros::given;
use serde_json::{Map, json};

fn create_session(world: &mut PipelineWorld) -> Result<(), eyre::Report> {
    let session = Session::new(world.project_id, None, Map::new(), &DefaultClock);
    run_async(InMemorySessionRepository::new(world.database.clone()).create(&session))
        .wrap_err("create scenario session")?;
    world.session_id = Some(session.id());
    Ok(())
}

#[given("an empty session")]
fn empty_session(world: &mut PipelineWorld) -> Result<(), eyre::Report> {
    create_session(world)
}

#[given("a session with {count:usize} text messages")]
fn session_with_messages(world: &mut PipelineWorld, count: usize) -> Result<(), eyre::Report> {
    create_session(world)?;
    let session_id = world.session()?;
    for n in 0..count {
        run_async(world.pipeline.send_message(SendMessageRequest::new(
            world.project_id,
            session_id,
            json!({"role": "user", "content": format!("message {n}")}),
        )))
        .wrap_err("send scenario message")?;
    }
    Ok(())
}
