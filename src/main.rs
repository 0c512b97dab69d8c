use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use studygen::app::AppState;
use studygen::clients::{ClientType, FlexibleClient, MockResponse};
use studygen::config::ServerConfig;
use studygen::generator::ArtifactGenerator;
use studygen::interceptors::TranscriptInterceptor;
use studygen::schema::{ArtifactKind, GeneratedArtifact};
use studygen::server::{run_server, ServerState};
use studygen::terminal;
use studygen::upload::UploadedFile;

#[derive(Parser)]
#[command(name = "studygen", version, about = "Turn a PDF into a quiz, flashcards or a matching game")]
#[command(after_help = "ENVIRONMENT VARIABLES:
    GOOGLE_GENERATIVE_AI_API_KEY  API key for the Gemini client
    STUDYGEN_BIND                 Listen address for `serve` [default: 127.0.0.1:3000]
    STUDYGEN_CLIENT               gemini | mock [default: gemini when a key is set]
    STUDYGEN_MODEL                Gemini model override
    STUDYGEN_MATCHING_PAIRS       Pairs per matching game, 4-20 [default: 8]
    STUDYGEN_MAX_DURATION_SECS    Execution ceiling per generation [default: 60]
    RUST_LOG                      Log filter [default: info]")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the generation endpoints over HTTP
    Serve {
        #[arg(long)]
        bind: Option<SocketAddr>,
        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// Generate an artifact from a PDF and write it as JSON
    Generate {
        pdf: PathBuf,
        #[arg(short, long, default_value = "quiz")]
        mode: ArtifactKind,
        /// Output file [default: stdout]
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Open the result in the terminal player
        #[arg(long)]
        play: bool,
        /// Canned model output for the mock client
        #[arg(long)]
        mock_response: Option<PathBuf>,
        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// Play a previously generated artifact in the terminal
    Play { artifact: PathBuf },
    /// List the learning modes `--mode` accepts
    Modes,
}

#[derive(Args)]
struct GenerationArgs {
    /// gemini | mock
    #[arg(long)]
    client: Option<ClientType>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    matching_pairs: Option<usize>,
    #[arg(long)]
    max_duration_secs: Option<u64>,
    /// Write every prompt/response pair to this directory
    #[arg(long)]
    transcripts: Option<PathBuf>,
}

impl GenerationArgs {
    /// Environment first, flags on top.
    fn server_config(&self) -> ServerConfig {
        let mut config = ServerConfig::from_env();
        if let Some(client) = self.client {
            config.client = client;
        }
        if self.model.is_some() {
            config.model = self.model.clone();
        }
        if let Some(pairs) = self.matching_pairs {
            config.generator = config.generator.with_matching_pairs(pairs);
        }
        if let Some(secs) = self.max_duration_secs {
            config.generator.max_duration = Duration::from_secs(secs);
        }
        config
    }

    fn attach_transcripts(&self, generator: ArtifactGenerator<FlexibleClient>) -> ArtifactGenerator<FlexibleClient> {
        match &self.transcripts {
            Some(dir) => generator.with_interceptor(Arc::new(TranscriptInterceptor::new(dir.clone()))),
            None => generator,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { bind, generation } => serve(bind, generation).await,
        Command::Generate { pdf, mode, output, play, mock_response, generation } => {
            generate(pdf, mode, output, play, mock_response, generation).await
        }
        Command::Play { artifact } => play(artifact),
        Command::Modes => {
            print!("{}", terminal::render_modes());
            Ok(())
        }
    }
}

async fn serve(bind: Option<SocketAddr>, args: GenerationArgs) -> Result<()> {
    let mut config = args.server_config();
    if let Some(bind) = bind {
        config.bind = bind;
    }
    info!(client = %config.client, bind = %config.bind, matching_pairs = config.generator.matching_pairs, "starting server");

    let client = FlexibleClient::from_type(config.client, config.model.as_deref())
        .context("failed to create model client")?;
    let state = ServerState::new(args.attach_transcripts(ArtifactGenerator::new(client, config.generator.clone())));

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
        }
        signal.cancel();
    });

    run_server(config.bind, state, shutdown).await.context("server failed")
}

async fn generate(
    pdf: PathBuf,
    mode: ArtifactKind,
    output: Option<PathBuf>,
    play_after: bool,
    mock_response: Option<PathBuf>,
    args: GenerationArgs,
) -> Result<()> {
    let config = args.server_config();
    let client = match &mock_response {
        Some(path) => {
            let canned = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            FlexibleClient::mock_with_responses(vec![MockResponse::Success(canned)]).0
        }
        None => FlexibleClient::from_type(config.client, config.model.as_deref())
            .context("failed to create model client")?,
    };
    let generator = args.attach_transcripts(ArtifactGenerator::new(client, config.generator.clone()));

    let file = UploadedFile::from_path(&pdf)
        .await
        .with_context(|| format!("failed to read {}", pdf.display()))?;
    let mut app = AppState::new(mode);
    app.select_files(vec![file]);
    if let Some(notice) = app.notice() {
        bail!("{}", notice);
    }

    let outcome = app
        .run_generation(&generator, &mut |status| {
            if let Some(label) = status.progress_label() {
                eprintln!("{} ({:.0}%)", label, status.progress_percent());
            }
        })
        .await;
    if let Err(e) = outcome {
        warn!(error = %e, "generation failed");
        bail!("{}", app.notice().unwrap_or("generation failed"));
    }

    let Some(artifact) = app.artifact.clone() else {
        bail!("generation finished without an artifact");
    };
    let json = serde_json::to_string_pretty(&artifact)?;
    match &output {
        Some(path) => {
            tokio::fs::write(path, &json)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "artifact written");
        }
        None => println!("{}", json),
    }

    if play_after {
        terminal::play(&artifact).context("terminal player failed")?;
    }
    Ok(())
}

fn play(path: PathBuf) -> Result<()> {
    let raw = std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let artifact: GeneratedArtifact =
        serde_json::from_str(&raw).with_context(|| format!("{} is not a generated artifact", path.display()))?;
    if let GeneratedArtifact::Matching(set) = &artifact {
        set.validate().context("invalid matching set")?;
    }
    terminal::play(&artifact).context("terminal player failed")
}
