#![cfg(feature = "integration")]

use std::sync::Arc;

use ditto_imagegen::{Env, LocalFileStorage, PromptInput, Result, Validation};

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(feature = "provider-hosted")]
#[tokio::test]
async fn hosted_generate_smoke() -> Result<()> {
    if env_nonempty(ditto_imagegen::ENV_HOSTED_API_KEY).is_none() {
        return Ok(());
    }

    let public = tempfile::tempdir()?;
    let tool = ditto_imagegen::StableDiffusionTool::from_env(
        "smoke",
        &Env::default(),
        Validation::Strict,
        Arc::new(LocalFileStorage::new(public.path())?),
    )?;
    let markdown = tool.call("a single red apple on a white table | blurry").await?;
    assert!(markdown.starts_with("![generated image](/images/smoke/img-"));
    Ok(())
}

#[cfg(feature = "provider-webui")]
#[tokio::test]
async fn webui_generate_smoke() -> Result<()> {
    let (Some(_), Some(_)) = (
        env_nonempty(ditto_imagegen::ENV_WEBUI_URL),
        env_nonempty(ditto_imagegen::ENV_WEBUI_TOKEN),
    ) else {
        return Ok(());
    };

    let public = tempfile::tempdir()?;
    let tool = ditto_imagegen::StableDiffusionWebUiTool::from_env(
        "smoke",
        &Env::default(),
        Validation::Strict,
        Arc::new(LocalFileStorage::new(public.path())?),
    )?;
    let markdown = tool
        .call(&PromptInput::new(
            "a single red apple on a white table",
            "blurry, lowres",
        ))
        .await?;
    assert!(markdown.starts_with("![generated image](/images/smoke/"));
    Ok(())
}
