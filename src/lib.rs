pub mod cache;
pub mod config;
pub mod constants;
pub mod deep_link;
pub mod error;
pub mod fetcher;
pub mod formatters;
pub mod geocoder;
pub mod models;
pub mod orchestrator;
pub mod registry;
pub mod render;
pub mod service;
pub mod upstream;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use orchestrator::{Event, NodeId, Orchestrator, SessionSnapshot};
pub use service::RoutePlanner;
