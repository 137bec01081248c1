//! Trait for chat-completion backends.

use crate::{ApiError, ChatOptions, Message};
use std::future::Future;
use std::pin::Pin;

/// A language model that returns the next message of a conversation.
///
/// Dyn-compatible so the chat client works with `Box<dyn ModelInteractor>`
/// and tests can inject scripted fakes.
pub trait ModelInteractor: Send + Sync {
    /// Send the conversation so far and return the model's next message.
    fn chat<'a>(
        &'a self,
        messages: &'a [Message],
        options: &'a ChatOptions,
    ) -> Pin<Box<dyn Future<Output = Result<Message, ApiError>> + Send + 'a>>;

    /// Backend name for logging (e.g. "openai").
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn interactor_is_dyn_compatible() {
        fn _accept(_m: &dyn ModelInteractor) {}
    }

    #[test]
    fn arc_interactor_is_send_sync() {
        fn _assert_send_sync<T: Send + Sync>() {}
        _assert_send_sync::<Arc<dyn ModelInteractor>>();
    }
}
