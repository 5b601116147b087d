use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use ditto_imagegen::{
    Env, FileStorage, LocalFileStorage, PromptInput, StableDiffusionTool,
    StableDiffusionWebUiTool, ToolsConfig, Validation,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProviderArg {
    Hosted,
    Webui,
}

/// Generate one image through a Stable Diffusion tool and print the markdown.
#[derive(Debug, Parser)]
#[command(name = "ditto-imagegen", version)]
struct Cli {
    #[arg(long, value_enum, default_value = "hosted")]
    provider: ProviderArg,
    #[arg(long)]
    prompt: String,
    #[arg(long, default_value = "")]
    negative_prompt: String,
    #[arg(long, default_value = "cli")]
    user_id: String,
    /// Directory served as the web root; images land in `<root>/images/<user>/`.
    #[arg(long, default_value = "public")]
    public_root: PathBuf,
    #[arg(long)]
    dotenv: Option<PathBuf>,
    /// TOML file with `[hosted]` / `[webui]` endpoint and parameter overrides.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json_logs: bool) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::Layer as _;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = if json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}

async fn run(cli: Cli) -> ditto_imagegen::Result<String> {
    let env = match cli.dotenv.as_ref() {
        Some(path) => Env::load_dotenv(path).await?,
        None => Env::default(),
    };
    let tools_config = match cli.config.as_ref() {
        Some(path) => ToolsConfig::load(path).await?,
        None => ToolsConfig::default(),
    };
    let storage: Arc<dyn FileStorage> =
        Arc::new(LocalFileStorage::from_env(&cli.public_root, &env)?);

    match cli.provider {
        ProviderArg::Hosted => {
            let config = tools_config.hosted_config(&env, Validation::Strict)?;
            let generator = ditto_imagegen::HostedImages::new(config)?;
            let tool = StableDiffusionTool::new(cli.user_id, Arc::new(generator), storage);
            let input = if cli.negative_prompt.trim().is_empty() {
                cli.prompt
            } else {
                format!("{} | {}", cli.prompt, cli.negative_prompt)
            };
            tool.call(&input).await
        }
        ProviderArg::Webui => {
            let config = tools_config.webui_config(&env, Validation::Strict)?;
            let generator = ditto_imagegen::WebUiImages::new(config)?;
            let tool = StableDiffusionWebUiTool::new(cli.user_id, Arc::new(generator), storage)
                .with_return_metadata(true);
            tool.call(&PromptInput::new(cli.prompt, cli.negative_prompt))
                .await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_tracing(cli.json_logs) {
        eprintln!("failed to init tracing: {err}");
        return ExitCode::from(2);
    }

    match run(cli).await {
        Ok(markdown) => {
            println!("{markdown}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(kind = err.kind().as_str(), "image tool call failed");
            eprintln!("{}", err.diagnostic());
            ExitCode::FAILURE
        }
    }
}
