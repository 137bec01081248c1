//! OpenAI chat-completions model interactor.

use crate::client::{ChatClient, ChatRequest};
use mcpchat_types::{ApiError, ChatOptions, FunctionTool, Message, ModelInteractor};
use std::future::Future;
use std::pin::Pin;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completions backend implementing [`ModelInteractor`].
///
/// The credential is an explicit constructor argument. Looking it up in the
/// environment is the config layer's job.
#[derive(Clone)]
pub struct OpenAiInteractor {
    client: ChatClient,
    model: String,
}

impl OpenAiInteractor {
    /// Build an interactor. An absent or blank credential fails with
    /// [`ApiError::MissingCredential`] before any HTTP client exists.
    pub fn new(
        credential: Option<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let api_key = credential
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(ApiError::MissingCredential)?;

        Ok(Self {
            client: ChatClient::new(api_key, base_url)?,
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send(&self, messages: &[Message], options: &ChatOptions) -> Result<Message, ApiError> {
        if messages.is_empty() {
            return Err(ApiError::BadRequest {
                message: "Conversation must contain at least one message".into(),
            });
        }

        let tools = options
            .tools
            .as_ref()
            .filter(|tools| !tools.is_empty())
            .map(|tools| tools.iter().map(FunctionTool::from).collect());
        // tool_choice is only meaningful alongside tools
        let tool_choice = options.tool_choice.as_ref().filter(|_| tools.is_some());

        let request = ChatRequest {
            model: &self.model,
            messages,
            tools,
            tool_choice,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };
        self.client.create_chat_completion(&request).await
    }
}

impl ModelInteractor for OpenAiInteractor {
    fn chat<'a>(
        &'a self,
        messages: &'a [Message],
        options: &'a ChatOptions,
    ) -> Pin<Box<dyn Future<Output = Result<Message, ApiError>> + Send + 'a>> {
        Box::pin(self.send(messages, options))
    }

    fn name(&self) -> &str {
        "openai"
    }
}
