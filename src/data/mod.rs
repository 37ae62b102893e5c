// Dataset adapters: ingestion, synthesis, persistence
pub mod dataset;
pub mod export;
pub mod synthetic;

pub use dataset::{ingest, DataTable, DatasetError};
pub use export::{write_data_output, write_round_log, write_summary, z_scores, ExportError};
pub use synthetic::example_table;
