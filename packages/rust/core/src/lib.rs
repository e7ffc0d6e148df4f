//! Core orchestration for kyukou: the task runner and the ingestion
//! pipeline that ties scraping and storage together.

pub mod pipeline;
pub mod runner;

pub use pipeline::{IngestStats, ingest_source, run_and_log};
pub use runner::run_task;
