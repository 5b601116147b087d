use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::generator::ImageGenerator;
use crate::profile::{
    DEFAULT_HTTP_TIMEOUT, ENV_HOSTED_API_KEY, Env, GenerationParams, HostedConfig, HttpAuth,
    build_http_client,
};
use crate::prompt::PromptInput;
use crate::types::{GeneratedImage, ImageSource};
use crate::utils::http::send_checked_json;
use crate::{ImageToolError, Result};

/// Client for the hosted Stable Diffusion endpoint, which answers with a URL
/// to the finished image.
#[derive(Clone)]
pub struct HostedImages {
    http: reqwest::Client,
    endpoint: String,
    auth: Option<HttpAuth>,
    params: GenerationParams,
}

impl std::fmt::Debug for HostedImages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedImages")
            .field("endpoint", &self.endpoint)
            .field("auth", &self.auth)
            .field("params", &self.params)
            .finish()
    }
}

impl HostedImages {
    pub fn new(config: HostedConfig) -> Result<Self> {
        let http = build_http_client(DEFAULT_HTTP_TIMEOUT, config.proxy.as_deref())?;
        let auth = if config.api_key.trim().is_empty() {
            None
        } else {
            Some(HttpAuth::bearer(&config.api_key)?)
        };
        Ok(Self {
            http,
            endpoint: config.endpoint,
            auth,
            params: config.params,
        })
    }

    pub fn from_env(env: &Env) -> Result<Self> {
        Self::new(HostedConfig::from_env(env)?)
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    fn payload<'a>(&'a self, prompt: &'a PromptInput) -> HostedPayload<'a> {
        HostedPayload {
            prompt: &prompt.prompt,
            negative_prompt: prompt.negative_prompt.as_str(),
            model: self.params.model.as_deref(),
            sampler: &self.params.sampler,
            steps: self.params.steps,
            cfg_scale: self.params.cfg_scale,
            width: self.params.width,
            height: self.params.height,
        }
    }
}

#[derive(Debug, Serialize)]
struct HostedPayload<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "is_blank")]
    negative_prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    sampler: &'a str,
    steps: u32,
    cfg_scale: f32,
    width: u32,
    height: u32,
}

fn is_blank(value: &&str) -> bool {
    value.trim().is_empty()
}

#[derive(Debug, Deserialize)]
struct HostedResponse {
    #[serde(default)]
    image_url: Option<String>,
}

#[async_trait]
impl ImageGenerator for HostedImages {
    fn provider(&self) -> &str {
        "stable-diffusion-hosted"
    }

    async fn generate(&self, prompt: &PromptInput) -> Result<GeneratedImage> {
        let Some(auth) = self.auth.as_ref() else {
            return Err(ImageToolError::Configuration(format!(
                "Missing {ENV_HOSTED_API_KEY} environment variable."
            )));
        };

        tracing::debug!(endpoint = %self.endpoint, "requesting hosted image generation");
        let req = auth.apply(self.http.post(&self.endpoint)).json(&self.payload(prompt));
        let parsed = send_checked_json::<HostedResponse>(req).await?;

        let url = parsed
            .image_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                ImageToolError::MissingData(
                    "No image URL returned from Stable Diffusion API.".to_string(),
                )
            })?;

        Ok(GeneratedImage::new(ImageSource::Url(url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use httpmock::{Method::POST, MockServer};

    fn client(server: &MockServer, api_key: &str) -> Result<HostedImages> {
        HostedImages::new(HostedConfig::new(api_key).with_endpoint(server.url("/generate")))
    }

    #[tokio::test]
    async fn returns_image_url_and_sends_fixed_params() -> Result<()> {
        if crate::utils::test_support::should_skip_httpmock() {
            return Ok(());
        }
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/generate")
                    .header("authorization", "Bearer sk-test")
                    .body_includes("\"prompt\":\"a red fox\"")
                    .body_includes("\"negative_prompt\":\"blurry\"")
                    .body_includes("\"sampler\":\"DPM++ 2M Karras\"")
                    .body_includes("\"width\":1024");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(
                        serde_json::json!({ "image_url": "https://cdn.example.com/a/fox.webp" })
                            .to_string(),
                    );
            })
            .await;

        let image = client(&server, "sk-test")?
            .generate(&PromptInput::new("a red fox", "blurry"))
            .await?;

        mock.assert_async().await;
        assert_eq!(
            image.source,
            ImageSource::Url("https://cdn.example.com/a/fox.webp".to_string())
        );
        assert!(image.metadata.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn missing_image_url_is_missing_data() -> Result<()> {
        if crate::utils::test_support::should_skip_httpmock() {
            return Ok(());
        }
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/generate");
                then.status(200)
                    .header("content-type", "application/json")
                    .body("{\"status\":\"queued\"}");
            })
            .await;

        let err = client(&server, "sk-test")?
            .generate(&PromptInput::parse_delimited("a red fox"))
            .await
            .expect_err("no url in reply");
        assert_eq!(err.kind(), ErrorKind::MissingData);
        assert!(err.to_string().contains("No image URL returned"));
        Ok(())
    }

    #[tokio::test]
    async fn non_success_status_is_network_error() -> Result<()> {
        if crate::utils::test_support::should_skip_httpmock() {
            return Ok(());
        }
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/generate");
                then.status(503).body("maintenance");
            })
            .await;

        let err = client(&server, "sk-test")?
            .generate(&PromptInput::parse_delimited("a red fox"))
            .await
            .expect_err("503 must fail");
        match &err {
            ImageToolError::Api { status, body } => {
                assert_eq!(status.as_u16(), 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.kind(), ErrorKind::Network);
        Ok(())
    }

    #[tokio::test]
    async fn blank_api_key_fails_at_call_time() -> Result<()> {
        let client = HostedImages::new(HostedConfig::new(""))?;
        let err = client
            .generate(&PromptInput::parse_delimited("anything"))
            .await
            .expect_err("no credentials");
        assert_eq!(err.kind(), ErrorKind::Configuration);
        Ok(())
    }
}
