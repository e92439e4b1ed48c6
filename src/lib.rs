pub mod app;
pub mod attendance;
pub mod backend;
pub mod charts;
pub mod client;
pub mod config;
pub mod edit;
pub mod errors;
pub mod eta;
pub mod forms;
pub mod handlers;
pub mod live;
pub mod models;
pub mod notify;
pub mod predictions;
pub mod records;
pub mod render;
pub mod state;
pub mod stats;
pub mod storage;
pub mod store;
pub mod sync;
pub mod tabs;
pub mod ui;

pub use app::router;
pub use client::CrudClient;
pub use config::Settings;
pub use state::AppState;
pub use storage::load_data;
pub use store::FleetStore;
pub use sync::{PollSettings, SyncManager};
