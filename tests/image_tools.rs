#![cfg(all(feature = "provider-hosted", feature = "provider-webui"))]

use std::sync::Arc;

use httpmock::Method::{GET, POST};
use httpmock::MockServer;
use serde_json::json;

use ditto_imagegen::utils::test_support::{should_skip_httpmock, tiny_png};
use ditto_imagegen::{
    Env, ErrorKind, HostedConfig, HostedImages, ImageToolbox, LocalFileStorage, Result,
    StableDiffusionTool, StableDiffusionWebUiTool, ToolCall, ToolExecutor, Validation,
    WebUiConfig, WebUiImages,
};

fn markdown_path(markdown: &str) -> &str {
    markdown
        .strip_prefix("![generated image](")
        .and_then(|rest| rest.strip_suffix(')'))
        .expect("markdown image tag")
}

#[tokio::test]
async fn hosted_tool_downloads_and_links_image() -> Result<()> {
    if should_skip_httpmock() {
        return Ok(());
    }
    let server = MockServer::start_async().await;
    let image_url = server.url("/cdn/render/fox.jpeg?token=abc");
    let generate = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/generate")
                .header("authorization", "Bearer sk-test")
                .body_includes("\"prompt\":\"a red fox in snow\"")
                .body_includes("\"negative_prompt\":\"blurry\"");
            then.status(200)
                .header("content-type", "application/json")
                .body(json!({ "image_url": image_url }).to_string());
        })
        .await;
    let download = server
        .mock_async(|when, then| {
            when.method(GET).path("/cdn/render/fox.jpeg");
            then.status(200).body("jpeg-bytes");
        })
        .await;

    let public = tempfile::tempdir()?;
    let generator =
        HostedImages::new(HostedConfig::new("sk-test").with_endpoint(server.url("/generate")))?;
    let tool = StableDiffusionTool::new(
        "user-42",
        Arc::new(generator),
        Arc::new(LocalFileStorage::new(public.path())?),
    );

    let markdown = tool.call("a red fox in snow | blurry").await?;
    generate.assert_async().await;
    download.assert_async().await;

    let path = markdown_path(&markdown);
    assert!(path.starts_with("/images/user-42/img-"));
    assert!(path.ends_with(".jpeg"));
    let on_disk = public.path().join(path.trim_start_matches('/'));
    assert_eq!(std::fs::read(on_disk)?, b"jpeg-bytes");
    Ok(())
}

#[tokio::test]
async fn webui_tool_saves_png_from_raw_bytes() -> Result<()> {
    if should_skip_httpmock() {
        return Ok(());
    }
    let server = MockServer::start_async().await;
    let png = tiny_png();
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/generate-xl")
                .body_includes("\"token\":\"tok-1\"")
                .body_includes("\"sampler\":\"DPM++ 2M Karras\"");
            then.status(200)
                .header("content-type", "image/png")
                .body(png.clone());
        })
        .await;

    let public = tempfile::tempdir()?;
    let generator = WebUiImages::new(WebUiConfig::new(server.base_url(), "tok-1"))?;
    let toolbox = ImageToolbox::new().with_structured_tool(StableDiffusionWebUiTool::new(
        "user-7",
        Arc::new(generator),
        Arc::new(LocalFileStorage::new(public.path())?),
    ));

    let result = toolbox
        .execute(ToolCall {
            id: "call_1".to_string(),
            name: "stable-diffusion-webui".to_string(),
            arguments: json!({
                "prompt": "castle on a hill, golden hour",
                "negative_prompt": "lowres, watermark"
            }),
        })
        .await?;

    assert_eq!(result.tool_call_id, "call_1");
    assert_eq!(result.is_error, None);
    let path = markdown_path(&result.content);
    assert!(path.starts_with("/images/user-7/"));
    assert!(path.ends_with(".png"));
    let written = std::fs::read(public.path().join(path.trim_start_matches('/')))?;
    assert!(written.starts_with(&[0x89, b'P', b'N', b'G']));
    Ok(())
}

#[tokio::test]
async fn unreachable_provider_becomes_diagnostic() -> Result<()> {
    if should_skip_httpmock() {
        return Ok(());
    }
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/generate");
            then.status(502).body("bad gateway");
        })
        .await;

    let public = tempfile::tempdir()?;
    let generator =
        HostedImages::new(HostedConfig::new("sk-test").with_endpoint(server.url("/generate")))?;
    let toolbox = ImageToolbox::new().with_text_tool(StableDiffusionTool::new(
        "user-1",
        Arc::new(generator),
        Arc::new(LocalFileStorage::new(public.path())?),
    ));

    let result = toolbox
        .execute(ToolCall {
            id: "call_2".to_string(),
            name: "stable-diffusion".to_string(),
            arguments: json!("a red fox"),
        })
        .await?;
    assert_eq!(result.is_error, Some(true));
    assert!(
        result
            .content
            .starts_with("Something went wrong when trying to generate the image.")
    );
    assert!(result.content.contains("bad gateway"));
    Ok(())
}

#[tokio::test]
async fn user_named_like_storage_root_gets_resolvable_link() -> Result<()> {
    if should_skip_httpmock() {
        return Ok(());
    }
    let server = MockServer::start_async().await;
    let image_url = server.url("/cdn/abc.png");
    server
        .mock_async(|when, then| {
            when.method(POST).path("/generate");
            then.status(200)
                .header("content-type", "application/json")
                .body(json!({ "image_url": image_url }).to_string());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/cdn/abc.png");
            then.status(200).body("png-bytes");
        })
        .await;

    let public = tempfile::tempdir()?;
    let generator =
        HostedImages::new(HostedConfig::new("sk-test").with_endpoint(server.url("/generate")))?;
    let tool = StableDiffusionTool::new(
        "public",
        Arc::new(generator),
        Arc::new(LocalFileStorage::new(public.path())?),
    );

    let markdown = tool.call("a red fox").await?;
    let path = markdown_path(&markdown);
    assert!(path.starts_with("/images/public/img-"));
    assert!(public.path().join(path.trim_start_matches('/')).is_file());
    Ok(())
}

#[tokio::test]
async fn webui_html_reply_is_reported_as_missing_image() -> Result<()> {
    if should_skip_httpmock() {
        return Ok(());
    }
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/generate-xl");
            then.status(200)
                .header("content-type", "text/html")
                .body("<html>login required</html>");
        })
        .await;

    let public = tempfile::tempdir()?;
    let generator = WebUiImages::new(WebUiConfig::new(server.base_url(), "tok-1"))?;
    let tool = StableDiffusionWebUiTool::new(
        "user-8",
        Arc::new(generator),
        Arc::new(LocalFileStorage::new(public.path())?),
    );

    let err = tool
        .call_with_arguments(&json!({ "prompt": "castle", "negative_prompt": "fog" }))
        .await
        .expect_err("html reply has no image");
    assert_eq!(err.kind(), ErrorKind::MissingData);
    assert!(!err.diagnostic().starts_with("Failed to save the image locally."));
    assert!(!public.path().join("images").exists());
    Ok(())
}

#[tokio::test]
async fn toolbox_rejects_unregistered_tools() -> Result<()> {
    let toolbox = ImageToolbox::new();
    assert!(toolbox.is_empty());
    assert!(toolbox.tools().is_empty());

    let result = toolbox
        .execute(ToolCall {
            id: "call_3".to_string(),
            name: "stable-diffusion".to_string(),
            arguments: json!("anything"),
        })
        .await?;
    assert_eq!(result.is_error, Some(true));
    assert_eq!(result.content, "unknown tool: stable-diffusion");
    Ok(())
}

#[test]
fn construction_fails_without_required_env() {
    let empty = Env::isolated(Vec::<(String, String)>::new());
    let storage = Arc::new(LocalFileStorage::new("public").expect("storage"));

    let err = StableDiffusionTool::from_env("user-1", &empty, Validation::Strict, storage.clone())
        .err()
        .expect("hosted tool needs an api key");
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(
        StableDiffusionTool::from_env("user-1", &empty, Validation::Skip, storage.clone()).is_ok()
    );

    let err = StableDiffusionWebUiTool::from_env("user-1", &empty, Validation::Strict, storage.clone())
        .err()
        .expect("web ui tool needs url and token");
    assert_eq!(err.kind(), ErrorKind::Configuration);

    assert!(
        StableDiffusionWebUiTool::from_env("user-1", &empty, Validation::Skip, storage).is_ok()
    );
}
