//! # docqa-server
//!
//! The HTTP surface of docqa, built on axum.
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | GET | `/health` | liveness and the collection in use |
//! | POST | `/api/document/insert`, `/api/rag/insert` | upload and index a file |
//! | POST | `/api/rag/ask` | grounded answer |
//! | POST | `/api/rag/ask/stream` | grounded answer over SSE |
//! | POST | `/api/chat/test` | chat without retrieval |
//! | POST | `/api/chat/test/stream` | chat over SSE |
//! | GET | `/api/milvus/collections` | list collections |
//! | DELETE | `/api/milvus/collections/{name}` | release and drop a collection |
//!
//! Components are chosen from environment variables (see [`AppConfig`]) and
//! built once by [`bootstrap::build_state`].

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod rest;
pub mod server;
pub mod state;

pub use config::AppConfig;
pub use error::{Result, ServerError};
pub use rest::app_router;
pub use server::run_server;
pub use state::{AppState, MAX_UPLOAD_BYTES};
