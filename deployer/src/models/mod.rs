//! Data models

pub mod miner;
pub mod result;
pub mod target;
