use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::generator::ImageGenerator;
use crate::profile::{
    DEFAULT_HTTP_TIMEOUT, ENV_WEBUI_TOKEN, ENV_WEBUI_URL, Env, GenerationParams, WebUiConfig,
    build_http_client,
};
use crate::prompt::PromptInput;
use crate::types::{GeneratedImage, ImageMetadata, ImageSource};
use crate::utils::http::{content_type, read_body, send_checked};
use crate::{ImageToolError, Result};

const DEFAULT_MEDIA_TYPE: &str = "image/png";

/// Client for a self-hosted Stable Diffusion web UI. The server either
/// streams the encoded image back or wraps it in a JSON envelope.
#[derive(Clone)]
pub struct WebUiImages {
    http: reqwest::Client,
    server_url: String,
    token: String,
    params: GenerationParams,
}

impl std::fmt::Debug for WebUiImages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebUiImages")
            .field("server_url", &self.server_url)
            .field("token", &"<redacted>")
            .field("params", &self.params)
            .finish()
    }
}

impl WebUiImages {
    pub fn new(config: WebUiConfig) -> Result<Self> {
        let http = build_http_client(DEFAULT_HTTP_TIMEOUT, config.proxy.as_deref())?;
        Ok(Self {
            http,
            server_url: config.server_url,
            token: config.token,
            params: config.params,
        })
    }

    pub fn from_env(env: &Env) -> Result<Self> {
        Self::new(WebUiConfig::from_env(env)?)
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    fn generate_url(&self) -> Result<String> {
        let base = self.server_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(ImageToolError::Configuration(format!(
                "Missing {ENV_WEBUI_URL} environment variable."
            )));
        }
        if base.ends_with("/generate-xl") {
            return Ok(base.to_string());
        }
        Ok(format!("{base}/generate-xl"))
    }
}

#[derive(Debug, Serialize)]
struct WebUiPayload<'a> {
    token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    prompt: &'a str,
    negative_prompt: &'a str,
    sampler: &'a str,
    cfg_scale: f32,
    steps: u32,
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct WebUiJsonResponse {
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    info: Option<Value>,
}

#[async_trait]
impl ImageGenerator for WebUiImages {
    fn provider(&self) -> &str {
        "stable-diffusion-webui"
    }

    async fn generate(&self, prompt: &PromptInput) -> Result<GeneratedImage> {
        let url = self.generate_url()?;
        if self.token.trim().is_empty() {
            return Err(ImageToolError::Configuration(format!(
                "Missing {ENV_WEBUI_TOKEN} environment variable."
            )));
        }

        let payload = WebUiPayload {
            token: &self.token,
            model: self.params.model.as_deref(),
            prompt: &prompt.prompt,
            negative_prompt: &prompt.negative_prompt,
            sampler: &self.params.sampler,
            cfg_scale: self.params.cfg_scale,
            steps: self.params.steps,
            width: self.params.width,
            height: self.params.height,
        };

        tracing::debug!(url = %url, "requesting web ui image generation");
        let response = send_checked(self.http.post(url).json(&payload)).await?;
        let media_type = content_type(&response);
        let body = read_body(response).await?;

        match media_type.as_deref() {
            Some(media_type) if media_type.ends_with("json") => parse_json_reply(&body),
            Some(media_type) if !is_image_media_type(media_type) => {
                Err(ImageToolError::MissingData(format!(
                    "web ui replied with {media_type} instead of an image"
                )))
            }
            other => {
                if body.is_empty() {
                    return Err(ImageToolError::MissingData(
                        "web ui returned an empty image body".to_string(),
                    ));
                }
                let media_type = other
                    .filter(|m| m.starts_with("image/"))
                    .unwrap_or(DEFAULT_MEDIA_TYPE)
                    .to_string();
                Ok(GeneratedImage::new(ImageSource::Bytes {
                    data: body,
                    media_type,
                }))
            }
        }
    }
}

fn is_image_media_type(media_type: &str) -> bool {
    media_type.starts_with("image/") || media_type == "application/octet-stream"
}

fn parse_json_reply(body: &[u8]) -> Result<GeneratedImage> {
    let parsed = serde_json::from_slice::<WebUiJsonResponse>(body)?;
    let first = parsed
        .images
        .into_iter()
        .find(|item| !item.trim().is_empty())
        .ok_or_else(|| {
            ImageToolError::MissingData("No images returned from Stable Diffusion web UI.".into())
        })?;

    let metadata = parsed
        .info
        .as_ref()
        .map(ImageMetadata::from_info)
        .unwrap_or_default();

    Ok(GeneratedImage::new(decode_image_item(&first)?).with_metadata(metadata))
}

/// An item is either a remote URL, a `data:` URL, or bare base64.
fn decode_image_item(item: &str) -> Result<ImageSource> {
    let item = item.trim();
    if item.starts_with("http://") || item.starts_with("https://") {
        return Ok(ImageSource::Url(item.to_string()));
    }

    let (media_type, encoded) = match item
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
    {
        Some((media_type, encoded)) => (media_type.to_string(), encoded),
        None => (DEFAULT_MEDIA_TYPE.to_string(), item),
    };

    let data = BASE64.decode(encoded.as_bytes()).map_err(|err| {
        ImageToolError::MissingData(format!("image payload is not valid base64: {err}"))
    })?;
    if data.is_empty() {
        return Err(ImageToolError::MissingData(
            "image payload decoded to zero bytes".to_string(),
        ));
    }
    Ok(ImageSource::Bytes {
        data: Bytes::from(data),
        media_type,
    })
}
