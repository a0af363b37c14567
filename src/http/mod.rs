//! HTTP surface: static files and the WebSocket entry point

pub mod routes;

pub use routes::build_router;
