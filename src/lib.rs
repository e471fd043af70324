// src/lib.rs
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod logging;
pub mod lookup;
pub mod output;
pub mod types;
pub mod utils;

pub use cli::Args;
pub use engine::ScanEngine;
pub use types::{
    DomainRecord, Registrant, Registrar, ScanConfig, ScanError, ScanStats, WhoisResponse,
};
