pub mod archive;
pub mod comicinfo;
pub mod database;
pub mod date;
pub mod detail;
pub mod error;
pub mod fetch;
pub mod formatters;
pub mod model;
pub mod normalize;
pub mod parse;
pub mod preprocess;
pub mod results;
pub mod similarity;

pub use archive::{Injection, inject_comicinfo, read_comicinfo};

pub use comicinfo::{COMICINFO_ENTRY, ComicInfoConfig};
pub use comicinfo::{generate_comicinfo, generate_comicinfo_with_config};

pub use database::Tebeosfera;
pub use date::PartialDate;
pub use detail::{parse_issue, parse_issue_with_base};
pub use error::{Result, TebeoError};

#[cfg(feature = "fetch")]
pub use fetch::HttpFetcher;
pub use fetch::{ConnectionConfig, ConnectionConfigBuilder, DEFAULT_BASE_URL, Fetcher, fetch_file};

pub use formatters::{JsonConfig, JsonFormatter, TextConfig, TextFormatter};
pub use formatters::{hits_to_json, hits_to_text, record_to_json, record_to_text};
pub use model::{IssueRecord, Role, SearchHit, SearchKind};
pub use parse::Document;

pub use preprocess::PreprocessConfig;
pub use preprocess::preprocess_html;

pub use results::{parse_search_results, parse_search_results_with_base};
