//! Chat-completions API client for mcpchat.

mod client;
mod interactor;

pub use client::{ChatClient, ChatRequest};
pub use interactor::{DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAiInteractor};
