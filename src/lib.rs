pub mod analytics;
pub mod app;
pub mod config;
pub mod content;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod progress;
pub mod session;
pub mod state;
pub mod storage;
pub mod time_ago;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use state::AppState;
