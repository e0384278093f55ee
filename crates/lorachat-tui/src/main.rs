mod app;
mod handler;
mod logging;
mod rich_text;
mod scroll;
mod tui;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use lorachat_core::{Config, HttpTransport};

use app::App;
use tui::{EventHandler, Tui};

const ENDPOINT_ENV: &str = "LORACHAT_ENDPOINT";

#[derive(Parser, Debug)]
#[command(name = "lorachat", version)]
#[command(about = "Terminal chat client for the LoRa question-answering service")]
struct Cli {
    /// Chat endpoint that answers POSTed questions
    #[arg(long, env = ENDPOINT_ENV)]
    endpoint: Option<String>,

    /// Give up on an answer after this many seconds (0 waits forever)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Write logs here instead of the default data directory
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Store the resolved settings in the config file
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    /// Apply command line overrides on top of the config file
    fn merge_into(&self, mut config: Config) -> Config {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = Some(endpoint.clone());
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout_secs = Some(timeout);
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = Some(log_file.clone());
        }
        config
    }

    /// Settings written by `--save-config`: the resolved endpoint and
    /// timeout, with the log file left as the config file had it
    fn config_to_save(&self, file_config: Config) -> Config {
        let log_file = file_config.log_file.clone();
        Config {
            log_file,
            ..self.merge_into(file_config)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A broken config file should not keep the client from starting
    let (file_config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::new(), Some(e)),
    };
    let config = cli.merge_into(file_config.clone());

    logging::init(config.log_file().as_deref())?;
    if let Some(e) = config_error {
        tracing::warn!(error = %e, "ignoring config file, using defaults");
    }

    if cli.save_config {
        let path = cli.config_to_save(file_config).save()?;
        tracing::info!(path = %path.display(), "saved config");
    }

    let endpoint = config.endpoint().to_string();
    let timeout: Option<Duration> = config.request_timeout();
    let transport = HttpTransport::new(endpoint.clone(), timeout)?;
    tracing::info!(%endpoint, ?timeout, "starting lorachat");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut events = EventHandler::new();
    let mut app = App::new(Arc::new(transport), endpoint, events.sender());

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}
