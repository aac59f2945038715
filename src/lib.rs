// src/lib.rs — Library root for finchat

pub mod agent;
pub mod api;
pub mod infra;
pub mod provider;
pub mod sanitize;
pub mod session;
pub mod tools;
pub mod util;
