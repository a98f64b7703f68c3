pub mod json;
pub mod text;

pub use json::{JsonConfig, JsonFormatter, hits_to_json, record_to_json};
pub use text::{TextConfig, TextFormatter, hits_to_text, record_to_text};
