//! # Stockyard
//!
//! Workflow core of a multi-tenant inventory and accounting service: who may
//! sign up, who administers, and how a new account gets its tenant. Usable
//! both as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! stockyard = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::Path;
//! use stockyard::config;
//! use stockyard::server::{AppState, create_router};
//! use stockyard::store::{SqliteStore, Store};
//!
//! let config = config::load(Path::new("./data")).unwrap();
//! let store = SqliteStore::new(config.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), config));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

pub mod auth;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
pub mod workflow;
