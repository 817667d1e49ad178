pub mod addon;
pub mod aggregator;
pub mod app_state;
pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod iheart;
pub mod logging;
pub mod radio_browser;
pub mod stations;
pub mod stream_candidates;
pub mod upstream;

pub use aggregator::Aggregator;
pub use app_state::AppState;
pub use http::build_router;
