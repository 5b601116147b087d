use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageToolError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("api error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("missing image reference: {0}")]
    MissingData(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to parse json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of [`ImageToolError`], stable across variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Network,
    MissingData,
    Persistence,
    InvalidInput,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Network => "network",
            Self::MissingData => "missing_data",
            Self::Persistence => "persistence",
            Self::InvalidInput => "invalid_input",
        }
    }
}

impl ImageToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Api { .. } | Self::Http(_) => ErrorKind::Network,
            Self::MissingData(_) | Self::Json(_) => ErrorKind::MissingData,
            Self::Persistence(_) | Self::Io(_) | Self::Image(_) => ErrorKind::Persistence,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }

    /// Text shown to the end user in place of the generated image.
    pub fn diagnostic(&self) -> String {
        match self.kind() {
            ErrorKind::Network => format!(
                "Something went wrong when trying to generate the image. The Stable Diffusion API may be unavailable:\nError Message: {self}"
            ),
            ErrorKind::Persistence => {
                let detail = match self {
                    Self::Persistence(message) => message.clone(),
                    Self::Io(err) => err.to_string(),
                    Self::Image(err) => err.to_string(),
                    other => other.to_string(),
                };
                format!("Failed to save the image locally. {detail}")
            }
            _ => self.to_string(),
        }
    }

    /// Re-tags io/encoding failures raised while writing the artifact.
    pub(crate) fn into_persistence(self) -> Self {
        match self {
            Self::Persistence(_) => self,
            Self::Io(err) => Self::Persistence(err.to_string()),
            Self::Image(err) => Self::Persistence(err.to_string()),
            other => Self::Persistence(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ImageToolError>;
