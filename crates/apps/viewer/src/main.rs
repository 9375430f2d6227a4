mod config;
mod fetcher;
mod session;
mod surface;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use formats::SourceKind;
use runtime::PollOutcome;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{ViewConfig, ViewerArgs};
use crate::fetcher::HttpFeedFetcher;
use crate::session::Session;
use crate::surface::LogSurface;

async fn shutdown_signal(run_for: Option<Duration>) {
    match run_for {
        Some(limit) => tokio::time::sleep(limit).await,
        None => {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("failed to listen for Ctrl-C: {err}");
            }
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = ViewerArgs::parse();
    let view = match &args.view_config {
        Some(path) => match ViewConfig::load(path) {
            Ok(view) => view,
            Err(err) => {
                error!("{err}");
                return;
            }
        },
        None => ViewConfig::default(),
    };

    let fetcher = match HttpFeedFetcher::new(&args.proxy_url) {
        Ok(fetcher) => Arc::new(fetcher),
        Err(err) => {
            error!("failed to build HTTP client: {err}");
            return;
        }
    };

    info!(proxy = %args.proxy_url, "polling feeds");
    let mut session = Session::mount(fetcher, LogSurface::new(), view);
    let mut revisions = session.subscribe();

    let stop = shutdown_signal(args.run_for_secs.map(Duration::from_secs));
    tokio::pin!(stop);
    loop {
        tokio::select! {
            _ = &mut stop => break,
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                session.recompose();
            }
        }
    }

    let stats = session.store().stats();
    for kind in SourceKind::ALL {
        info!(
            source = %kind,
            replaced = stats.count(kind, PollOutcome::Replaced),
            kept_stale = stats.count(kind, PollOutcome::KeptStale),
            failed = stats.count(kind, PollOutcome::Failed),
            "poll summary"
        );
    }
    session.teardown().await;
    info!("session closed");
}
