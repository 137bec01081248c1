//! Shared types and error hierarchy for mcpchat.

pub mod error;
pub mod interactor;
pub mod message;
pub mod tool;

pub use error::{ApiError, ChatError, ConfigError, McpError};
pub use interactor::ModelInteractor;
pub use message::*;
pub use tool::*;
