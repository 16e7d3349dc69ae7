use std::io::{self, Write};

use anyhow::Context;
use clap::Parser;
use tracing::debug;

use calc_app::app::App;
use calc_app::cli::Cli;
use calc_app::config::AppConfig;
use calc_app::logging::init_logging;

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("cannot load configuration")?;
    config.apply_overrides(cli.backend, cli.db, cli.log_level);

    init_logging(&config.log_level, config.log_file.as_deref())?;
    debug!(?config, "configuration loaded");

    let app = App::connect(config).await?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    app.execute(cli.command, cli.json, &mut out).await?;
    out.flush()?;

    Ok(())
}
