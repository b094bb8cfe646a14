//! # LLM Helpers
//!
//! Provider dispatch for radkit LLM clients.
//!
//! radkit's workers are generic over the concrete LLM type, so the provider
//! match has to happen at the call site. [`with_llm!`] does that match once
//! and evaluates the given body with the constructed client bound to a name.

/// Build the LLM client for a [`ModelConfig`](crate::models::ModelConfig) and
/// evaluate `$body` with it bound to `$llm`.
///
/// Must be used inside a function returning `anyhow::Result`, because client
/// construction errors (missing API key, bad base URL) are propagated with `?`.
///
/// ```rust,ignore
/// let reply = with_llm!(&config, |llm| {
///     LlmWorker::<AgentReply>::builder(llm)
///         .with_system_instructions(SYSTEM_PROMPT)
///         .build()
///         .run(task)
///         .await
/// });
/// ```
#[macro_export]
macro_rules! with_llm {
    ($config:expr, |$llm:ident| $body:expr) => {{
        use radkit::models::providers::{
            AnthropicLlm, DeepSeekLlm, GeminiLlm, GrokLlm, OpenAILlm, OpenRouterLlm,
        };
        use $crate::models::LlmProvider;

        let config = $config;
        match config.provider {
            LlmProvider::Anthropic => {
                let $llm = AnthropicLlm::from_env(&config.model)?;
                $body
            }
            LlmProvider::OpenAI => {
                let $llm = match &config.base_url {
                    Some(base_url) => OpenAILlm::from_env(&config.model)?.with_base_url(base_url),
                    None => OpenAILlm::from_env(&config.model)?,
                };
                $body
            }
            LlmProvider::Gemini => {
                let $llm = GeminiLlm::from_env(&config.model)?;
                $body
            }
            LlmProvider::OpenRouter => {
                let $llm = OpenRouterLlm::from_env(&config.model)?;
                $body
            }
            LlmProvider::Grok => {
                let $llm = GrokLlm::from_env(&config.model)?;
                $body
            }
            LlmProvider::DeepSeek => {
                let $llm = DeepSeekLlm::from_env(&config.model)?;
                $body
            }
        }
    }};
}

pub use with_llm;
