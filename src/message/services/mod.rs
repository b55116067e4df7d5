//! Application services for the message module.

pub mod pipeline;

pub use pipeline::{GetMessagesOutput, GetMessagesRequest, MessagePipeline, SendMessageRequest};
