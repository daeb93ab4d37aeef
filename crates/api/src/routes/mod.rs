//! Route Handlers

pub mod bundle;
pub mod metrics;
pub mod predict;
