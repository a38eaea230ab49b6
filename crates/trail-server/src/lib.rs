pub mod config;
mod http_server;

pub use http_server::{build_router, run_http_server, AppState};
