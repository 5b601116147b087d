pub mod agent;
mod error;
pub mod generator;
pub mod markdown;
pub mod naming;
mod profile;
pub mod prompt;
pub mod providers;
pub mod storage;
pub mod types;
pub mod utils;

pub use error::{ErrorKind, ImageToolError, Result};
pub use profile::{
    DEFAULT_HOSTED_ENDPOINT, ENV_HOSTED_API_KEY, ENV_PROXY, ENV_WEBUI_TOKEN, ENV_WEBUI_URL, Env,
    GenerationParams, HostedConfig, ParamsOverride, ProviderSection, ToolsConfig, Validation,
    WebUiConfig, parse_dotenv,
};

pub use agent::{
    ImageToolbox, StableDiffusionTool, StableDiffusionWebUiTool, Tool, ToolCall, ToolExecutor,
    ToolResult,
};
pub use generator::ImageGenerator;
pub use markdown::{image_markdown, web_path};
pub use prompt::PromptInput;
pub use storage::{FileContext, FileStorage, FileStrategy, LocalFileStorage, SaveRequest, SavedFile};
pub use types::{GeneratedImage, ImageMetadata, ImageSource};

#[cfg(feature = "provider-hosted")]
pub use providers::HostedImages;
#[cfg(feature = "provider-webui")]
pub use providers::WebUiImages;
