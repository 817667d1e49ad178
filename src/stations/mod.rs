mod models;
mod sanitize;

pub use models::{Station, StreamCandidate, StreamSet};
pub use sanitize::{sanitize_logo_url, sanitize_stream_url};
