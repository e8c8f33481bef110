//! Entry point for the fleetfeed CLI. Parses args and streams the feed to
//! stdout as plain text lines.

use std::env;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

use fleetfeed::modes::{FileModeStore, ModeStore};
use fleetfeed::report::LogSink;
use fleetfeed::{ActiveMode, FeedConfig, FeedCoordinator};

struct ParsedArgs {
    url: Option<String>,
    mode: Option<ActiveMode>,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "fleetfeed".into());
    let usage = format!("Usage: {prog} [--mode push|pull|-m push|pull] [http://HOST:PORT]");
    let mut url: Option<String> = None;
    let mut mode: Option<ActiveMode> = None;

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(usage),
            "--mode" | "-m" => {
                let value = it.next().ok_or_else(|| usage.clone())?;
                mode = Some(value.parse().map_err(|e| format!("{e}\n{usage}"))?);
            }
            _ if arg.starts_with("--mode=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        mode = Some(v.parse().map_err(|e| format!("{e}\n{usage}"))?);
                    }
                }
            }
            _ => {
                if url.is_none() {
                    url = Some(arg);
                } else {
                    return Err(format!("Unexpected argument. {usage}"));
                }
            }
        }
    }
    Ok(ParsedArgs { url, mode })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Reuse the same parsing logic for testability
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };

    let base = parsed
        .url
        .unwrap_or_else(|| "http://127.0.0.1:8080".to_string());
    let base_url: Url = base
        .parse()
        .with_context(|| format!("invalid base url {base:?}"))?;

    let store = Arc::new(FileModeStore);
    if let Some(mode) = parsed.mode {
        // explicit flag wins and is remembered for next time
        store.set(mode);
    }

    let coordinator = FeedCoordinator::new(FeedConfig::new(base_url), store, Arc::new(LogSink))?;

    coordinator.events().on_connection_change(|status| {
        info!(status = %status.display(), "channel status");
    });
    coordinator.events().on_snapshots(|batch| {
        let online = batch.iter().filter(|s| s.is_online).count();
        println!("{} servers ({online} online)", batch.len());
        for s in batch {
            println!(
                "  {:<24} cpu {:5.1}%  ram {:5.1}%  disk {:5.1}%  net {}/{} B/s  {}",
                s.name,
                s.cpu_percent,
                s.ram_percent,
                s.disk_percent,
                s.net_in_speed,
                s.net_out_speed,
                if s.is_online { "up" } else { "down" },
            );
        }
    });

    coordinator.initialize().await;
    info!(mode = %coordinator.mode(), "feed running; ctrl-c to exit");

    tokio::signal::ctrl_c().await?;
    coordinator.cleanup();
    Ok(())
}
