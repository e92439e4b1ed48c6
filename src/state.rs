use crate::client::CrudClient;
use crate::forms::SubmitGuard;
use crate::store::FleetStore;
use crate::sync::SyncManager;

#[derive(Clone)]
pub struct AppState {
    /// Backend side: the authoritative records and their live feed.
    pub store: FleetStore,
    /// Dashboard side: REST calls, live tables, in-flight submissions.
    pub client: CrudClient,
    pub sync: SyncManager,
    pub submissions: SubmitGuard,
}

impl AppState {
    pub fn new(store: FleetStore, client: CrudClient, sync: SyncManager) -> Self {
        Self {
            store,
            client,
            sync,
            submissions: SubmitGuard::default(),
        }
    }
}
