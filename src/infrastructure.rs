//! Infrastructure layer for fetching, parsing, configuration and logging
//!
//! Everything that touches the network, the filesystem or raw page content
//! lives here; the domain layer stays pure.

pub mod config; // Configuration file and defaults
pub mod fetch_port; // Fetch seam used by source adapters
pub mod http_client; // reqwest-backed fetch port
pub mod logging; // Logging infrastructure
pub mod parsing; // Tiered product extraction

pub use config::{AggregatorConfig, AppConfig, ConfigManager, SourcesConfig};
pub use fetch_port::{FetchError, FetchKind, FetchPort, FetchRequest, FetchResponse};
pub use http_client::{HttpClientConfig, HttpFetcher};
pub use logging::{get_log_directory, init_logging_with_config};
pub use parsing::{ExtractionPipeline, ParsingError, ParsingResult, Payload};
