//! CLI command implementations.

mod ask;
mod config;
mod ingest;
mod retrieve;
mod status;

pub use ask::run_ask;
pub use config::run_config;
pub use ingest::run_ingest;
pub use retrieve::run_retrieve;
pub use status::run_status;
