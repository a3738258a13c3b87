//! Completion-service seam: "submit image, receive extracted text".
//!
//! The extract stage only knows [`TableExtractor`]. [`VisionExtractor`] is
//! the production implementation over an `edgequake-llm` provider; tests
//! substitute scripted extractors without touching the network.
//!
//! One attempt per image. A failed call is reported to the stage, which
//! logs it and moves on; there is no retry here.

use crate::config::{PipelineConfig, DEFAULT_MODEL};
use crate::error::{Pdf2TableError, ServiceError};
use crate::pipeline::encode::EncodedImage;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Response of one completion call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// Text of each returned choice, in service order. May be empty.
    pub choices: Vec<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Completion {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            choices: vec![text.into()],
            ..Default::default()
        }
    }

    /// Text of the first choice, or `""` when the service returned none.
    pub fn first_text(&self) -> &str {
        self.choices.first().map(String::as_str).unwrap_or("")
    }
}

/// Sends one page image to a multimodal model and returns its answer.
pub trait TableExtractor {
    fn extract(
        &self,
        image: &EncodedImage,
    ) -> impl Future<Output = Result<Completion, ServiceError>> + Send;
}

/// [`TableExtractor`] over any vision-capable [`LLMProvider`].
///
/// ## Message layout
/// 1. **System message**: JSON-table instruction (or config override)
/// 2. **User message**: short text instruction plus the page as a base64
///    image attachment
pub struct VisionExtractor {
    provider: Arc<dyn LLMProvider>,
    label: String,
    system_prompt: String,
    user_prompt: String,
    max_tokens: usize,
    temperature: Option<f32>,
}

impl VisionExtractor {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &PipelineConfig) -> Self {
        let label = match config.provider_name {
            Some(ref name) => format!("{}/{}", name, config.model),
            None => config.model.clone(),
        };
        Self {
            provider,
            label,
            system_prompt: config.effective_system_prompt().to_string(),
            user_prompt: config.effective_user_prompt().to_string(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// Resolve the provider from `config` and wrap it.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, Pdf2TableError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config))
    }

    fn build_messages(&self, image: &EncodedImage) -> Vec<ChatMessage> {
        let image_data = ImageData::new(image.data.clone(), image.mime_type).with_detail("high");
        vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user_with_images(self.user_prompt.as_str(), vec![image_data]),
        ]
    }

    fn build_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

impl TableExtractor for VisionExtractor {
    async fn extract(&self, image: &EncodedImage) -> Result<Completion, ServiceError> {
        let messages = self.build_messages(image);
        let options = self.build_options();

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ServiceError::new(self.label.as_str(), e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            image.source.display(),
            response.prompt_tokens,
            response.completion_tokens
        );

        Ok(Completion {
            choices: vec![response.content],
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Pdf2TableError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Pdf2TableError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. `config.provider`, a pre-built provider, used as-is.
/// 2. `config.provider_name` + `config.model`.
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, both set.
/// 4. `OPENAI_API_KEY` set → OpenAI with `config.model`.
/// 5. `ProviderFactory::from_env()` auto-detection.
pub fn resolve_provider(config: &PipelineConfig) -> Result<Arc<dyn LLMProvider>, Pdf2TableError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = if config.model.trim().is_empty() {
        DEFAULT_MODEL
    } else {
        config.model.as_str()
    };

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_vision_provider(&prov, &env_model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Pdf2TableError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
