//! # Static Asset Server
//!
//! Serves the diagnostic page, its scripts and its WebAssembly module from one
//! directory.
//!
//! # Endpoints
//!
//! - `GET /*` - file under the asset root; `.wasm` as `application/wasm`

pub mod config;
pub mod server;

pub use config::HttpServerConfig;
pub use server::{HttpServer, ServerError, WASM_CONTENT_TYPE};
