// src/output/mod.rs
mod index;
mod sink;

pub use index::{file_name, highest_index, last_index, next_start_index, parse_index};
pub use sink::RotatingSink;
