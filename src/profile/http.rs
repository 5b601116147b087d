use std::time::Duration;

use crate::{ImageToolError, Result};

pub(crate) const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// Builds the client a provider keeps for its lifetime, routing through
/// `proxy` when one is configured.
pub(crate) fn build_http_client(timeout: Duration, proxy: Option<&str>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(timeout);
    if let Some(proxy) = proxy.map(str::trim).filter(|p| !p.is_empty()) {
        let proxy = reqwest::Proxy::all(proxy).map_err(|err| {
            ImageToolError::Configuration(format!("invalid proxy url {proxy:?}: {err}"))
        })?;
        builder = builder.proxy(proxy);
    }
    builder.build().map_err(ImageToolError::Http)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_client_without_proxy() {
        assert!(build_http_client(DEFAULT_HTTP_TIMEOUT, None).is_ok());
        assert!(build_http_client(DEFAULT_HTTP_TIMEOUT, Some("   ")).is_ok());
    }

    #[test]
    fn builds_client_with_proxy() {
        assert!(build_http_client(DEFAULT_HTTP_TIMEOUT, Some("http://127.0.0.1:3128")).is_ok());
    }
}
