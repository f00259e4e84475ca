pub mod alerts;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod scheduler;
pub mod stats;
pub mod symbols;
pub mod types;
pub mod upstream;
pub mod validation;
pub mod web;
