use crate::backend;
use crate::handlers;
use crate::models::{Bus, Driver, MaintenanceLog, Route};
use crate::records::Record;
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/predict", get(handlers::predict))
        .route("/forms/:resource", post(handlers::create))
        .route("/forms/:resource/:id", post(handlers::save_edit))
        .route("/forms/:resource/:id/delete", post(handlers::delete))
        .route("/attendance/:id", post(handlers::attendance))
        .route("/live/events", get(handlers::live_events))
        .merge(api_routes())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(crud_routes::<Bus>())
        .merge(crud_routes::<Driver>())
        .merge(crud_routes::<Route>())
        .merge(crud_routes::<MaintenanceLog>())
        .route("/api/drivers/:id/attendance", post(backend::mark_attendance))
        .route("/api/predictions", get(backend::prediction))
        .route("/api/summary", get(backend::summary))
        .route("/api/public/buses", get(backend::public_list::<Bus>))
        .route("/api/public/drivers", get(backend::public_list::<Driver>))
        .route("/api/public/routes", get(backend::public_list::<Route>))
        .route("/api/public/location-update", post(backend::location_update))
}

fn crud_routes<R: Record>() -> Router<AppState> {
    let collection = R::RESOURCE.api_path();
    let record = format!("{collection}/:id");
    Router::new()
        .route(&collection, post(backend::create::<R>))
        .route(&record, put(backend::update::<R>).delete(backend::delete::<R>))
}
