use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a generated image can be read from.
#[derive(Clone, PartialEq, Eq)]
pub enum ImageSource {
    Url(String),
    Bytes { data: Bytes, media_type: String },
}

impl std::fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
            Self::Bytes { data, media_type } => f
                .debug_struct("Bytes")
                .field("len", &data.len())
                .field("media_type", media_type)
                .finish(),
        }
    }
}

impl ImageSource {
    pub fn png(data: impl Into<Bytes>) -> Self {
        Self::Bytes {
            data: data.into(),
            media_type: "image/png".to_string(),
        }
    }

    pub fn is_url(&self) -> bool {
        matches!(self, Self::Url(_))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub infotexts: Vec<String>,
}

impl ImageMetadata {
    pub fn is_empty(&self) -> bool {
        self.width.is_none()
            && self.height.is_none()
            && self.seed.is_none()
            && self.infotexts.is_empty()
    }

    /// Reads the generation info a web UI attaches to its reply. `info` may be
    /// an object or a JSON-encoded string; unknown shapes yield empty metadata.
    pub fn from_info(info: &Value) -> Self {
        let parsed;
        let obj = match info {
            Value::Object(obj) => obj,
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(obj)) => {
                    parsed = obj;
                    &parsed
                }
                _ => return Self::default(),
            },
            _ => return Self::default(),
        };

        let as_u32 = |key: &str| {
            obj.get(key)
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
        };
        Self {
            width: as_u32("width"),
            height: as_u32("height"),
            seed: obj.get("seed").and_then(Value::as_i64),
            infotexts: obj
                .get("infotexts")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub source: ImageSource,
    pub metadata: ImageMetadata,
}

impl GeneratedImage {
    pub fn new(source: ImageSource) -> Self {
        Self {
            source,
            metadata: ImageMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ImageMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}
