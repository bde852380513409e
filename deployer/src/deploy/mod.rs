//! Deployment module

pub mod compose;
pub mod docker;
pub mod fsm;
pub mod lifecycle;
pub mod negotiate;
pub mod orchestrator;
pub mod provision;
pub mod status;
