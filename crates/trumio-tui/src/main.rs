use std::time::Duration;
use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::info;
use trumio_core::{service_or_unconfigured, Config, Dispatcher, Provider, Session};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "trumio")]
#[command(about = "Terminal chat client for generative-language APIs", version)]
struct Cli {
    /// Provider to chat with (gemini, ollama, claude, openai)
    #[arg(short, long)]
    provider: Option<String>,
    /// Model to use; defaults to the configured or provider default model
    #[arg(short, long)]
    model: Option<String>,
    /// Seconds to wait for a reply before giving up
    #[arg(short, long)]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = logging::init()?;

    let (config, config_path) = app::load_config(Config::get_config_path().ok());

    let provider = match cli.provider.as_deref() {
        Some(name) => Provider::from_name(name).ok_or_else(|| anyhow!("Unknown provider: {}", name))?,
        None => config.provider(),
    };

    let model = cli.model.unwrap_or_else(|| match &config.default_model {
        Some(model) if config.provider() == provider => model.clone(),
        _ => provider.default_model().to_string(),
    });

    let timeout = cli
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.request_timeout());

    info!(
        provider = provider.as_str(),
        model = %model,
        timeout_secs = timeout.as_secs(),
        log = ?log_path,
        "starting trumio"
    );

    let dispatcher = Dispatcher::new(service_or_unconfigured(provider, &config), model)
        .with_timeout(timeout);
    let mut app = App::new(Session::new(dispatcher), config).with_config_path(config_path);

    let mut terminal = tui::init()?;
    tui::install_panic_hook();

    let result = run(&mut terminal, &mut app).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event).await?;

        if let Some(result) = app.session.poll().await {
            app.on_request_settled(result);
        }
    }

    info!("exiting");
    Ok(())
}
