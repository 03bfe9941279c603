//! Data sources and sinks around the evaluator
//!
//! Everything here only builds datasets for `ingest` or writes out results;
//! the evaluator never calls back into this module.

pub mod csv;
pub mod export;
pub mod sample;

pub use self::csv::{load_csv, read_csv, write_dataset_csv, write_report_csv};
pub use export::{report_from_json, report_to_json, save_report_json, write_report_json};
pub use sample::SampleGenerator;
