//! speed-reader-rs: clipboard speed reader for Linux.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use speed_reader::clipboard::SystemClipboard;
use speed_reader::config::Config;
use speed_reader::controller::{SessionController, SpeedLimits};
use speed_reader::hotkey::EvdevHotkeys;
use speed_reader::notifier::Notifier;
use speed_reader::presenter::TerminalPresenter;
use speed_reader::service::ReaderService;
use speed_reader::settings::FileSettingsStore;
use speed_reader::summarizer::{OpenAiSummarizer, Summarizer, SummaryBackend};

#[derive(Parser, Debug)]
#[command(name = "speed-reader-rs", about = "Clipboard speed reader with AI summaries")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the settings file holding the reading speed
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Logs go to stderr so they don't tear the frames drawn on stdout.
    let filter = if args.verbose {
        EnvFilter::new("debug,reqwest=info,hyper=info")
    } else {
        EnvFilter::new("info,reqwest=warn,hyper=warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("speed-reader-rs starting");

    let config = Config::load(args.config.as_deref());
    info!("Config loaded: {:?}", config.hotkey);

    let settings_path = args.settings.unwrap_or_else(|| config.reader.settings_path());
    let settings = FileSettingsStore::with_path(&settings_path);
    info!("Settings file: {}", settings_path.display());

    let api_key = config.summarizer.resolve_api_key();
    let backend: Option<Arc<dyn SummaryBackend>> =
        match OpenAiSummarizer::new(&config.summarizer, api_key) {
            Ok(provider) => {
                info!(
                    "Summaries via {} (model: {})",
                    config.summarizer.host, config.summarizer.model
                );
                Some(Arc::new(provider))
            }
            Err(e) => {
                warn!("Summaries disabled: {e}");
                None
            }
        };

    let (settled_tx, settled_rx) = mpsc::unbounded_channel();
    let summarizer = Summarizer::new(backend, settled_tx);

    let controller = SessionController::new(
        SystemClipboard::new(),
        settings,
        summarizer,
        SpeedLimits::from(&config.reader),
    );

    let mut service = ReaderService::new(
        controller,
        TerminalPresenter::stdout(),
        Notifier::new(config.feedback.notifications),
        settled_rx,
    );

    service.run(EvdevHotkeys::new(&config.hotkey)).await;

    Ok(())
}
