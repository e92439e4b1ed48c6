use fleet_admin::{load_data, router, AppState, CrudClient, FleetStore, Settings, SyncManager};
use std::{future::IntoFuture, net::SocketAddr, sync::Arc};
use tokio::{fs, signal};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let settings = Settings::from_env();
    if let Some(parent) = settings.data_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let data = load_data(&settings.data_path).await;
    let store = FleetStore::new(settings.data_path.clone(), data);
    store.mark_ready();

    let sync = SyncManager::new(settings.poll);
    sync.init(Arc::new(store.clone()));

    let client = CrudClient::new(settings.api_base_url.clone());
    info!(api = client.base_url(), "dashboard talks to fleet API");
    if !settings.api_is_local() {
        warn!(
            api = client.base_url(),
            "fleet API is not this server; live tables only follow local changes"
        );
    }

    let app = router(AppState::new(store, client, sync.clone()));
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Open event streams never finish on their own, so stop on ctrl-c
    // instead of waiting for connections to drain.
    tokio::select! {
        served = axum::serve(listener, app).into_future() => {
            if let Err(err) = served {
                error!("server stopped: {err}");
            }
        }
        _ = signal::ctrl_c() => info!("shutting down"),
    }
    sync.teardown();

    Ok(())
}
