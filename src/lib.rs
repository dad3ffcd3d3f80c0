pub mod bench;
pub mod config;
pub mod errors;
pub mod executor;
pub mod generator;
pub mod parser;
pub mod reporter;
pub mod stats;
pub mod types;
