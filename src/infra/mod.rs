// src/infra/mod.rs — Cross-cutting infrastructure

pub mod cache;
pub mod config;
pub mod errors;
pub mod logger;
pub mod rate_limit;
