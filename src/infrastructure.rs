//! Infrastructure layer: HTTP, parsing, configuration, logging and files
//!
//! Everything that touches the network, the filesystem or the process
//! environment lives here. The application layer composes these pieces;
//! the domain layer never sees them.

pub mod atomic_file;
pub mod config;
pub mod debug_capture;
pub mod http_client;
pub mod logging;
pub mod parsing;
pub mod parsing_error;
pub mod query_source;
pub mod renderer;
pub mod retry_calculator;
pub mod sites;
pub mod storage;

pub use atomic_file::AtomicFileUpdate;
pub use config::{AppConfig, ConfigManager};
pub use http_client::{FetchOutcome, FetchStatus, Fetcher, HttpSession, Retrieval};
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use parsing::{ParsingError, ParsingResult, ProductDetailParser, ProductListParser};
pub use query_source::QuerySource;
pub use sites::{Site, SiteProfile};
pub use storage::ProductStore;
