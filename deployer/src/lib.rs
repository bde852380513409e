//! Miner Deploy Library
//!
//! Provisions a host, locally or over ssh, and runs the solo miner
//! container on it.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod exec;
pub mod filesys;
pub mod logs;
pub mod models;
pub mod prompt;
pub mod settings;
pub mod utils;
