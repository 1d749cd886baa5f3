mod config;
mod db;
mod error;
mod export;
mod market_data;
mod pipeline;
mod selector;
mod types;
mod validator;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    for w in &cfg.warnings {
        warn!("{w}");
    }

    info!(mode = %cfg.selection_mode, "Daily stock fetch started");

    match pipeline::run_once(&cfg).await {
        Ok(summary) if summary.selected == 0 => {
            info!("No tickers selected; nothing to do");
        }
        Ok(_) => {}
        Err(e) => {
            error!(kind = e.kind(), fatal = e.is_fatal(), "Run aborted: {e}");
            std::process::exit(1);
        }
    }
}
