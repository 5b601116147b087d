use std::path::Path;

use serde::{Deserialize, Serialize};

use super::env::Env;
use crate::{ImageToolError, Result};

pub const ENV_HOSTED_API_KEY: &str = "STABLE_DIFFUSION_API_KEY";
pub const ENV_WEBUI_URL: &str = "SD_WEBUI_URL";
pub const ENV_WEBUI_TOKEN: &str = "SD_WEBUI_TOKEN";
pub const ENV_PROXY: &str = "PROXY";

pub const DEFAULT_HOSTED_ENDPOINT: &str = "https://visioncraft.top/generate";

/// Fixed sampling parameters sent with every request of one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub sampler: String,
    pub steps: u32,
    pub cfg_scale: f32,
    pub width: u32,
    pub height: u32,
}

impl GenerationParams {
    pub fn hosted() -> Self {
        Self {
            model: None,
            sampler: "DPM++ 2M Karras".to_string(),
            steps: 30,
            cfg_scale: 7.0,
            width: 1024,
            height: 1024,
        }
    }

    pub fn webui_xl() -> Self {
        Self {
            model: Some("juggernautXL".to_string()),
            sampler: "DPM++ 2M Karras".to_string(),
            steps: 50,
            cfg_scale: 7.0,
            width: 1024,
            height: 1024,
        }
    }

    fn apply(&mut self, overrides: &ParamsOverride) {
        if let Some(model) = overrides.model.as_deref().filter(|m| !m.trim().is_empty()) {
            self.model = Some(model.to_string());
        }
        if let Some(sampler) = overrides.sampler.as_deref().filter(|s| !s.trim().is_empty()) {
            self.sampler = sampler.to_string();
        }
        if let Some(steps) = overrides.steps {
            self.steps = steps;
        }
        if let Some(cfg_scale) = overrides.cfg_scale {
            self.cfg_scale = cfg_scale;
        }
        if let Some(width) = overrides.width {
            self.width = width;
        }
        if let Some(height) = overrides.height {
            self.height = height;
        }
    }
}

/// Whether construction insists on the required env values.
///
/// `Skip` exists so tests and tool listings can build a config without
/// credentials; a tool built that way fails at call time instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validation {
    #[default]
    Strict,
    Skip,
}

#[derive(Clone, PartialEq)]
pub struct HostedConfig {
    pub api_key: String,
    pub endpoint: String,
    pub proxy: Option<String>,
    pub params: GenerationParams,
}

impl std::fmt::Debug for HostedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedConfig")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("proxy", &self.proxy)
            .field("params", &self.params)
            .finish()
    }
}

impl HostedConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_HOSTED_ENDPOINT.to_string(),
            proxy: None,
            params: GenerationParams::hosted(),
        }
    }

    pub fn from_env(env: &Env) -> Result<Self> {
        Self::from_env_with(env, Validation::Strict)
    }

    pub fn from_env_with(env: &Env, validation: Validation) -> Result<Self> {
        let api_key = match validation {
            Validation::Strict => env.require(ENV_HOSTED_API_KEY)?,
            Validation::Skip => env.get(ENV_HOSTED_API_KEY).unwrap_or_default(),
        };
        Ok(Self {
            proxy: env.get(ENV_PROXY),
            ..Self::new(api_key)
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    fn apply(&mut self, section: &ProviderSection) {
        if let Some(endpoint) = section.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
            self.endpoint = endpoint.to_string();
        }
        self.params.apply(&section.params);
    }
}

#[derive(Clone, PartialEq)]
pub struct WebUiConfig {
    pub server_url: String,
    pub token: String,
    pub proxy: Option<String>,
    pub params: GenerationParams,
}

impl std::fmt::Debug for WebUiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebUiConfig")
            .field("server_url", &self.server_url)
            .field("token", &"<redacted>")
            .field("proxy", &self.proxy)
            .field("params", &self.params)
            .finish()
    }
}

impl WebUiConfig {
    pub fn new(server_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            token: token.into(),
            proxy: None,
            params: GenerationParams::webui_xl(),
        }
    }

    pub fn from_env(env: &Env) -> Result<Self> {
        Self::from_env_with(env, Validation::Strict)
    }

    pub fn from_env_with(env: &Env, validation: Validation) -> Result<Self> {
        let (server_url, token) = match validation {
            Validation::Strict => (env.require(ENV_WEBUI_URL)?, env.require(ENV_WEBUI_TOKEN)?),
            Validation::Skip => (
                env.get(ENV_WEBUI_URL).unwrap_or_default(),
                env.get(ENV_WEBUI_TOKEN).unwrap_or_default(),
            ),
        };
        Ok(Self {
            proxy: env.get(ENV_PROXY),
            ..Self::new(server_url, token)
        })
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    fn apply(&mut self, section: &ProviderSection) {
        if let Some(endpoint) = section.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
            self.server_url = endpoint.to_string();
        }
        self.params.apply(&section.params);
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ParamsOverride {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub sampler: Option<String>,
    #[serde(default)]
    pub steps: Option<u32>,
    #[serde(default)]
    pub cfg_scale: Option<f32>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ProviderSection {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(flatten)]
    pub params: ParamsOverride,
}

/// Non-secret settings read from a TOML file. Credentials always come from
/// [`Env`].
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub hosted: Option<ProviderSection>,
    #[serde(default)]
    pub webui: Option<ProviderSection>,
}

impl ToolsConfig {
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|err| ImageToolError::Configuration(format!("invalid tools config: {err}")))
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|err| {
            ImageToolError::Configuration(format!(
                "failed to read tools config {}: {err}",
                path.display()
            ))
        })?;
        Self::parse(&contents)
    }

    pub fn hosted_config(&self, env: &Env, validation: Validation) -> Result<HostedConfig> {
        let mut config = HostedConfig::from_env_with(env, validation)?;
        if let Some(section) = self.hosted.as_ref() {
            config.apply(section);
        }
        Ok(config)
    }

    pub fn webui_config(&self, env: &Env, validation: Validation) -> Result<WebUiConfig> {
        let mut config = WebUiConfig::from_env_with(env, validation)?;
        if let Some(section) = self.webui.as_ref() {
            config.apply(section);
        }
        Ok(config)
    }
}
