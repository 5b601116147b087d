#[cfg(feature = "provider-hosted")]
mod auth;
mod config;
mod env;
mod http;

#[cfg(feature = "provider-hosted")]
pub(crate) use auth::HttpAuth;
pub use config::{
    DEFAULT_HOSTED_ENDPOINT, ENV_HOSTED_API_KEY, ENV_PROXY, ENV_WEBUI_TOKEN, ENV_WEBUI_URL,
    GenerationParams, HostedConfig, ParamsOverride, ProviderSection, ToolsConfig, Validation,
    WebUiConfig,
};
pub use env::{Env, parse_dotenv};
pub(crate) use http::{DEFAULT_HTTP_TIMEOUT, build_http_client};
