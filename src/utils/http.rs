use bytes::Bytes;
use futures_util::StreamExt;

use crate::{ImageToolError, Result};

const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;
const MAX_IMAGE_BODY_BYTES: usize = 32 * 1024 * 1024;

async fn response_bytes_truncated(
    response: reqwest::Response,
    max_bytes: usize,
) -> Result<(Vec<u8>, bool)> {
    let max_bytes = max_bytes.max(1);
    let mut out = Vec::<u8>::new();
    let mut truncated = false;

    let mut stream = response.bytes_stream();
    while let Some(next) = stream.next().await {
        let chunk = next?;
        let remaining = max_bytes.saturating_sub(out.len());
        if chunk.len() <= remaining {
            out.extend_from_slice(chunk.as_ref());
        } else {
            out.extend_from_slice(&chunk.as_ref()[..remaining]);
            truncated = true;
            break;
        }
    }
    Ok((out, truncated))
}

async fn api_error(response: reqwest::Response) -> ImageToolError {
    let status = response.status();
    let body = match response_bytes_truncated(response, MAX_ERROR_BODY_BYTES).await {
        Ok((bytes, truncated)) => {
            let mut body = String::from_utf8_lossy(&bytes).to_string();
            if truncated {
                body.push_str("\n...(truncated)");
            }
            body
        }
        Err(err) => format!("<failed to read error body: {err}>"),
    };
    ImageToolError::Api { status, body }
}

pub(crate) async fn send_checked(req: reqwest::RequestBuilder) -> Result<reqwest::Response> {
    let response = req.send().await?;
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    Ok(response)
}

#[cfg(feature = "provider-hosted")]
/// Parses the body as JSON; a body that does not match `T` is a provider
/// reply without the expected fields.
pub(crate) async fn send_checked_json<T: serde::de::DeserializeOwned>(
    req: reqwest::RequestBuilder,
) -> Result<T> {
    let response = send_checked(req).await?;
    let bytes = read_body(response).await?;
    serde_json::from_slice::<T>(&bytes).map_err(ImageToolError::Json)
}

pub(crate) async fn read_body(response: reqwest::Response) -> Result<Bytes> {
    let (bytes, truncated) = response_bytes_truncated(response, MAX_IMAGE_BODY_BYTES).await?;
    if truncated {
        return Err(ImageToolError::MissingData(format!(
            "response exceeded max bytes ({MAX_IMAGE_BODY_BYTES})"
        )));
    }
    Ok(Bytes::from(bytes))
}

#[cfg(feature = "provider-webui")]
pub(crate) fn content_type(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
        .filter(|value| !value.is_empty())
}
