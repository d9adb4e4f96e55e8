pub mod config;
mod http_layers;
pub mod metrics;
pub mod server;
mod sound_routes;
pub mod state;
mod tempo_routes;
mod variation_routes;

pub use config::ServerConfig;
pub use http_layers::*;
#[allow(unused_imports)] // Used by main.rs
pub use server::run_server;
