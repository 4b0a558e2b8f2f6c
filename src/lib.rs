// library crate for rulebatch
// the binary in main.rs is a thin driver over these modules

pub mod cli;
pub mod config;
pub mod model;
pub mod rules;
