use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::profile::{DEFAULT_HTTP_TIMEOUT, ENV_PROXY, Env, build_http_client};
use crate::types::ImageSource;
use crate::utils::http::{read_body, send_checked};
use crate::{ImageToolError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStrategy {
    #[default]
    Local,
    S3,
    Firebase,
    Azure,
}

impl FileStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::S3 => "s3",
            Self::Firebase => "firebase",
            Self::Azure => "azure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileContext {
    ImageGeneration,
}

impl FileContext {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ImageGeneration => "image_generation",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub user_id: String,
    pub strategy: FileStrategy,
    pub source: ImageSource,
    pub file_name: String,
    pub base_path: String,
    pub context: FileContext,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    /// Path or URL the saved image is served from.
    pub filepath: String,
}

/// The host application's file service. It owns where and how long images
/// live; tools only ask for a file to be created.
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn save(&self, request: SaveRequest) -> Result<SavedFile>;
}

/// Stores images on local disk under `<public_root>/<base_path>/<user_id>/`.
#[derive(Clone)]
pub struct LocalFileStorage {
    public_root: PathBuf,
    http: reqwest::Client,
}

impl std::fmt::Debug for LocalFileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFileStorage")
            .field("public_root", &self.public_root)
            .finish()
    }
}

impl LocalFileStorage {
    pub fn new(public_root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_proxy(public_root, None)
    }

    /// Downloads of remote images go through `proxy` when one is given.
    pub fn with_proxy(public_root: impl Into<PathBuf>, proxy: Option<&str>) -> Result<Self> {
        Ok(Self {
            public_root: public_root.into(),
            http: build_http_client(DEFAULT_HTTP_TIMEOUT, proxy)?,
        })
    }

    /// Same proxy lookup as the providers (`PROXY`).
    pub fn from_env(public_root: impl Into<PathBuf>, env: &Env) -> Result<Self> {
        Self::with_proxy(public_root, env.get(ENV_PROXY).as_deref())
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn public_root(&self) -> &Path {
        &self.public_root
    }

    async fn fetch(&self, url: &str) -> Result<Bytes> {
        let response = send_checked(self.http.get(url)).await?;
        read_body(response).await
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(&self, request: SaveRequest) -> Result<SavedFile> {
        if request.strategy != FileStrategy::Local {
            return Err(ImageToolError::Persistence(format!(
                "local storage cannot handle the {} strategy",
                request.strategy.as_str()
            )));
        }

        let base_path = safe_segment(&request.base_path, "base path")?;
        let user_id = safe_segment(&request.user_id, "user id")?;
        let file_name = safe_segment(&request.file_name, "file name")?;

        let dir = self.public_root.join(base_path).join(user_id);
        let target = dir.join(file_name);

        let data = match &request.source {
            ImageSource::Url(url) => self
                .fetch(url)
                .await
                .map_err(|err| ImageToolError::Persistence(format!("download failed: {err}")))?,
            ImageSource::Bytes { data, .. } => {
                let data = data.clone();
                tokio::task::spawn_blocking(move || encode_png(&data))
                    .await
                    .map_err(|err| {
                        ImageToolError::Persistence(format!("png encode join error: {err}"))
                    })??
            }
        };

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| ImageToolError::from(err).into_persistence())?;
        tokio::fs::write(&target, &data)
            .await
            .map_err(|err| ImageToolError::from(err).into_persistence())?;

        tracing::debug!(
            path = %target.display(),
            bytes = data.len(),
            context = request.context.as_str(),
            "saved generated image"
        );

        Ok(SavedFile {
            filepath: format!("/{base_path}/{user_id}/{file_name}"),
        })
    }
}

/// Re-encodes any decodable image as PNG.
fn encode_png(data: &[u8]) -> Result<Bytes> {
    let image = image::load_from_memory(data)
        .map_err(|err| ImageToolError::from(err).into_persistence())?;
    let mut out = Cursor::new(Vec::<u8>::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .map_err(|err| ImageToolError::from(err).into_persistence())?;
    Ok(Bytes::from(out.into_inner()))
}

fn safe_segment<'a>(raw: &'a str, what: &str) -> Result<&'a str> {
    let trimmed = raw.trim().trim_matches('/');
    let mut components = Path::new(trimmed).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(trimmed),
        _ => Err(ImageToolError::Persistence(format!(
            "invalid {what}: {raw:?}"
        ))),
    }
}
