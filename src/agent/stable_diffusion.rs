use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::generator::ImageGenerator;
use crate::markdown::{DEFAULT_STORAGE_PREFIX, image_markdown, web_path};
use crate::naming::{name_for_bytes, name_for_url};
use crate::prompt::PromptInput;
use crate::storage::{FileContext, FileStorage, FileStrategy, SaveRequest};
use crate::types::{GeneratedImage, ImageSource};
use crate::{ImageToolError, Result};

use super::toolbox::ToolExecutor;
use super::types::{Tool, ToolCall, ToolResult};

pub const TOOL_STABLE_DIFFUSION: &str = "stable-diffusion";
pub const TOOL_STABLE_DIFFUSION_WEBUI: &str = "stable-diffusion-webui";

const IMAGES_BASE_PATH: &str = "images";

const TEXT_PROMPT_GUIDANCE: &str = "Generate images with 'stable-diffusion'. Only use this tool for visual content.
Guidelines:
- Describe what should be seen: mood, subject details, structure, style, proportions.
- Show, don't tell: phrase the input the way you would describe a photograph or a painting.
- Format the input as \"comma separated keywords for the subject | keywords to keep out of the image\".
- Example: \"portrait photo of an old fisherman, weathered skin, harbor at dawn, mist, 85mm, soft light, film grain | cartoon, 3d render, sketch, lowres, deformed hands, watermark\"
- Generate one image per user request unless the user explicitly asks for more.";

const STRUCTURED_PROMPT_GUIDANCE: &str = "Generate images from text with 'stable-diffusion-webui'. Only use this tool for visual content.
Guidelines:
- Always pass {\"prompt\": \"7+ detailed keywords\", \"negative_prompt\": \"7+ detailed keywords\"}.
- Always include the returned markdown image in your final answer so the user can see it.
- Describe what should be seen: mood, subject details, structure, style, proportions.
- Generate one image per user request unless the user explicitly asks for more.";

/// Construction-time state shared by both tools. Nothing here changes after
/// construction, so concurrent calls on one tool do not interfere.
#[derive(Clone)]
struct ImageToolContext {
    user_id: String,
    strategy: FileStrategy,
    base_path: String,
    storage_prefix: String,
    generator: Arc<dyn ImageGenerator>,
    storage: Arc<dyn FileStorage>,
}

impl ImageToolContext {
    fn new(
        user_id: String,
        generator: Arc<dyn ImageGenerator>,
        storage: Arc<dyn FileStorage>,
    ) -> Self {
        Self {
            user_id,
            strategy: FileStrategy::default(),
            base_path: IMAGES_BASE_PATH.to_string(),
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_string(),
            generator,
            storage,
        }
    }

    /// Generates, persists, and returns the markdown for the saved file along
    /// with the generation metadata.
    async fn generate_markdown(&self, prompt: &PromptInput) -> Result<(String, GeneratedImage)> {
        let provider = self.generator.provider().to_string();
        let generated = self.generator.generate(prompt).await.inspect_err(|err| {
            tracing::error!(provider = %provider, error = %err, "image generation failed");
        })?;

        let file_name = match &generated.source {
            ImageSource::Url(url) => name_for_url(url),
            ImageSource::Bytes { .. } => name_for_bytes(),
        };
        tracing::debug!(
            provider = %provider,
            user_id = %self.user_id,
            image_name = %file_name,
            remote = generated.source.is_url(),
            "persisting generated image"
        );

        let saved = self
            .storage
            .save(SaveRequest {
                user_id: self.user_id.clone(),
                strategy: self.strategy,
                source: generated.source.clone(),
                file_name: file_name.clone(),
                base_path: self.base_path.clone(),
                context: FileContext::ImageGeneration,
            })
            .await
            .map_err(|err| {
                tracing::error!(image_name = %file_name, error = %err, "error while saving the image");
                err.into_persistence()
            })?;

        if saved.filepath.trim().is_empty() {
            return Err(ImageToolError::Persistence(
                "storage returned an empty file path".to_string(),
            ));
        }

        let markdown = image_markdown(&web_path(&saved.filepath, &self.storage_prefix));
        tracing::info!(provider = %provider, image_name = %file_name, "generated image saved");
        Ok((markdown, generated))
    }
}

macro_rules! impl_context_builders {
    ($ty:ty) => {
        impl $ty {
            pub fn with_file_strategy(mut self, strategy: FileStrategy) -> Self {
                self.ctx.strategy = strategy;
                self
            }

            pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
                self.ctx.base_path = base_path.into();
                self
            }

            pub fn with_storage_prefix(mut self, prefix: impl Into<String>) -> Self {
                self.ctx.storage_prefix = prefix.into();
                self
            }

            pub fn user_id(&self) -> &str {
                &self.ctx.user_id
            }
        }
    };
}

/// Free-text tool: the model sends `"prompt | negative prompt"`.
#[derive(Clone)]
pub struct StableDiffusionTool {
    ctx: ImageToolContext,
}

impl_context_builders!(StableDiffusionTool);

impl StableDiffusionTool {
    pub fn new(
        user_id: impl Into<String>,
        generator: Arc<dyn ImageGenerator>,
        storage: Arc<dyn FileStorage>,
    ) -> Self {
        Self {
            ctx: ImageToolContext::new(user_id.into(), generator, storage),
        }
    }

    #[cfg(feature = "provider-hosted")]
    pub fn from_env(
        user_id: impl Into<String>,
        env: &crate::profile::Env,
        validation: crate::profile::Validation,
        storage: Arc<dyn FileStorage>,
    ) -> Result<Self> {
        let config = crate::profile::HostedConfig::from_env_with(env, validation)?;
        let generator = crate::providers::HostedImages::new(config)?;
        Ok(Self::new(user_id, Arc::new(generator), storage))
    }

    pub fn definition() -> Tool {
        Tool {
            name: TOOL_STABLE_DIFFUSION.to_string(),
            description: Some(TEXT_PROMPT_GUIDANCE.to_string()),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "input": {
                        "type": "string",
                        "description": "Positive keywords, then `|`, then negative keywords."
                    }
                },
                "required": ["input"]
            }),
            strict: None,
        }
    }

    /// Returns `![generated image](<path>)` for the saved image.
    pub async fn call(&self, input: &str) -> Result<String> {
        let prompt = PromptInput::parse_delimited(input);
        let (markdown, _) = self.ctx.generate_markdown(&prompt).await?;
        Ok(markdown)
    }
}

#[async_trait]
impl ToolExecutor for StableDiffusionTool {
    async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
        if call.name != TOOL_STABLE_DIFFUSION {
            return Ok(ToolResult::error(
                call.id,
                format!("unknown tool: {}", call.name),
            ));
        }

        let prompt = match PromptInput::from_text_arguments(&call.arguments) {
            Ok(prompt) => prompt,
            Err(err) => return Ok(ToolResult::from_error(call.id, &err)),
        };

        Ok(match self.ctx.generate_markdown(&prompt).await {
            Ok((markdown, _)) => ToolResult::ok(call.id, markdown),
            Err(err) => ToolResult::from_error(call.id, &err),
        })
    }
}

/// Structured tool: the model sends `{prompt, negative_prompt}`.
#[derive(Clone)]
pub struct StableDiffusionWebUiTool {
    ctx: ImageToolContext,
    return_metadata: bool,
}

impl_context_builders!(StableDiffusionWebUiTool);

impl StableDiffusionWebUiTool {
    pub fn new(
        user_id: impl Into<String>,
        generator: Arc<dyn ImageGenerator>,
        storage: Arc<dyn FileStorage>,
    ) -> Self {
        Self {
            ctx: ImageToolContext::new(user_id.into(), generator, storage),
            return_metadata: false,
        }
    }

    #[cfg(feature = "provider-webui")]
    pub fn from_env(
        user_id: impl Into<String>,
        env: &crate::profile::Env,
        validation: crate::profile::Validation,
        storage: Arc<dyn FileStorage>,
    ) -> Result<Self> {
        let config = crate::profile::WebUiConfig::from_env_with(env, validation)?;
        let generator = crate::providers::WebUiImages::new(config)?;
        Ok(Self::new(user_id, Arc::new(generator), storage))
    }

    /// Appends the generation metadata (seed, size, infotexts) as JSON after
    /// the markdown.
    pub fn with_return_metadata(mut self, return_metadata: bool) -> Self {
        self.return_metadata = return_metadata;
        self
    }

    pub fn definition() -> Tool {
        Tool {
            name: TOOL_STABLE_DIFFUSION_WEBUI.to_string(),
            description: Some(STRUCTURED_PROMPT_GUIDANCE.to_string()),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "minLength": 1,
                        "description": "Detailed keywords describing the subject, at least 7, comma separated."
                    },
                    "negative_prompt": {
                        "type": "string",
                        "minLength": 1,
                        "description": "Keywords to keep out of the image, at least 7, comma separated."
                    }
                },
                "required": ["prompt", "negative_prompt"],
                "additionalProperties": false
            }),
            strict: Some(true),
        }
    }

    pub async fn call(&self, prompt: &PromptInput) -> Result<String> {
        let (markdown, generated) = self.ctx.generate_markdown(prompt).await?;
        if !self.return_metadata || generated.metadata.is_empty() {
            return Ok(markdown);
        }
        let metadata = serde_json::to_string(&generated.metadata)?;
        Ok(format!("{markdown}\n{metadata}"))
    }

    /// Validates raw tool arguments before calling.
    pub async fn call_with_arguments(&self, arguments: &Value) -> Result<String> {
        let prompt = PromptInput::from_arguments(arguments)?;
        self.call(&prompt).await
    }
}

#[async_trait]
impl ToolExecutor for StableDiffusionWebUiTool {
    async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
        if call.name != TOOL_STABLE_DIFFUSION_WEBUI {
            return Ok(ToolResult::error(
                call.id,
                format!("unknown tool: {}", call.name),
            ));
        }

        Ok(match self.call_with_arguments(&call.arguments).await {
            Ok(markdown) => ToolResult::ok(call.id, markdown),
            Err(err) => ToolResult::from_error(call.id, &err),
        })
    }
}
