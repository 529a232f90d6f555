//!
//! policyhub server binary
//! ------------------------
//! Command-line entry point for the policyhub HTTP server. Configuration comes
//! from CLI flags and environment variables; see `--help`.

use anyhow::Result;
use std::env;

use policyhub::config::{has_flag, log_filter, usage, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    println!(r"                 ___                 __          __
    ____  ____  / (_)______  ______  / /_  __  __/ /_
   / __ \/ __ \/ / / ___/ / / / __ \/ __ \/ / / / __ \
  / /_/ / /_/ / / / /__/ /_/ / / / / / / / /_/ / /_/ /
 / .___/\____/_/_/\___/\__, /_/ /_/_/ /_/\__,_/_.___/
/_/                   /____/");

    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(env::var("RUST_LOG").ok().as_deref()))
        .try_init();

    let args: Vec<String> = env::args().skip(1).collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("{}", usage());
        return Ok(());
    }

    let cfg = match ServerConfig::from_env_and_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}\n\n{}", usage());
            std::process::exit(2);
        }
    };
    println!("policyhub starting: http={}:{}, store={:?}, database={}", cfg.bind, cfg.http_port, cfg.store, cfg.database);
    tracing::info!("Using port: http={}, db_root={}", cfg.http_port, cfg.db_root.display());
    policyhub::server::run_with_config(cfg).await
}
