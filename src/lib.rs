pub mod app;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod hipster;
pub mod lastfm;
pub mod models;
pub mod state;
pub mod stats;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use hipster::{Category, HipsterError, ScoringProfile, format_listener_count};
pub use state::AppState;
