pub mod config;
pub mod output;
pub mod utils;
pub mod probe;
pub mod listing;
pub mod http_client;
pub mod concurrent;

// re-export modules used in tests
pub use crate::config::{ClientConfig, PageLimit, ScanConfig};
pub use crate::http_client::{BlobTransport, FetchResponse};
pub use crate::probe::{ContainerProber, DispatchReport, Dispatcher, ProbeOutcome, ScanTarget};
