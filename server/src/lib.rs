//! RequestLens: filter compilation, pricing and metrics over LLM request logs

pub mod app;
pub mod core;
pub mod data;
pub mod domain;
pub mod utils;
