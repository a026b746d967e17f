pub mod container;
pub mod dispatcher;

pub use container::{ContainerProber, ProbeOutcome, ScanTarget};
pub use dispatcher::{batches, enumerate_targets, Batch, DispatchReport, Dispatcher};
