//! Headless live tracking client

use std::sync::Arc;

use boat_tracker::{
    auth::StoredTokenProvider,
    backend::BackendClient,
    config::AppConfig,
    errors::BoatTrackerError,
    keychain::{CredentialStore, FileCredentialStore},
    live::{self, LiveTracker, LiveUpdate},
    socket::SocketClientBuilder,
};
use tokio::signal;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<(), BoatTrackerError> {
    #[cfg(feature = "dotenvy")]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load()?;
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e);
    }

    let host = config.backend.host()?;
    let store: Arc<dyn CredentialStore> =
        Arc::new(FileCredentialStore::new(&config.credentials.path));
    let auth = Arc::new(StoredTokenProvider::new(store, host));
    let token = auth.current().await?;

    let backend = BackendClient::new(&config.backend, auth)?;
    backend.set_token(token).await;

    let track = match &config.tracker.track {
        Some(track) => track.clone(),
        None => {
            let tracks = backend.tracks().await?;
            match tracks.into_iter().next() {
                Some(track) => track.track_name,
                None => {
                    warn!("No tracks available to follow");
                    return Ok(());
                }
            }
        }
    };

    let builder = SocketClientBuilder::new(&config.backend, &config.tracker);
    let rx = builder.subscribe();
    let socket = builder.connect(&track, backend.token_source())?;

    tokio::select! {
        _ = live::run(rx, LiveTracker::new(&config.tracker), log_update) => {
            info!("Live updates ended");
        }
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    socket.close();
    Ok(())
}

fn log_update(update: &LiveUpdate) {
    match update {
        LiveUpdate::Track { render, camera } => {
            let position = render.position.map(|p| p.coord);
            info!(
                "Track {}: {} points, position {:?}, camera {:?}",
                render.track_name, render.point_count, position, camera
            );
        }
        LiveUpdate::Vessels(vessels) => {
            for vessel in vessels {
                debug!(
                    "Vessel {} {} at {:?}, bearing {:.0}, trail {}",
                    vessel.mmsi,
                    vessel.name,
                    vessel.coord,
                    vessel.bearing,
                    vessel.trail.len()
                );
            }
        }
        LiveUpdate::Status(status) => info!("Feed status: {:?}", status),
        LiveUpdate::Cleared => debug!("Live state cleared"),
    }
}
