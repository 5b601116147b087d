use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};

use crate::{ImageToolError, Result};

/// A single credential header, marked sensitive so it never shows up in logs.
#[derive(Clone)]
pub(crate) struct HttpAuth {
    pub(crate) header: HeaderName,
    pub(crate) value: HeaderValue,
}

impl std::fmt::Debug for HttpAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAuth")
            .field("header", &self.header)
            .field("value", &"<redacted>")
            .finish()
    }
}

impl HttpAuth {
    pub(crate) fn bearer(token: &str) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ImageToolError::Configuration(
                "bearer token must be non-empty".to_string(),
            ));
        }

        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|err| {
            ImageToolError::Configuration(format!("invalid bearer token: {err}"))
        })?;
        value.set_sensitive(true);

        Ok(Self {
            header: AUTHORIZATION,
            value,
        })
    }

    pub(crate) fn apply(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header(self.header.clone(), self.value.clone())
    }
}
