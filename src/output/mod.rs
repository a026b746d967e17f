pub mod reporter;
pub mod results;

pub use reporter::{report_channel, spawn_reporter, ReportMessage, ReportSender};
pub use results::{AccountSummary, ContainerStats, ResultsMap, Summary};
