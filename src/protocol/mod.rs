//! Wire types for the message-streaming API's annotation contract.

pub mod annotations;

pub use annotations::{Annotation, AssistantMessage, ProgressAnnotation, TokenUsage};
