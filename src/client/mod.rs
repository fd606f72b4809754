//! Backend client modules
//!
//! A focused client for the MMLink bot backend: a pure HTTP layer, watchers
//! that bind resources to observable fetch state, and a mutation runner.

pub mod api;
pub mod config;
pub mod error;
pub mod mutation;
pub mod service;
pub mod watcher;

// Re-export main types for convenience
pub use api::BackendApi;
pub use config::{ClientConfig, WatchOptions};
pub use error::{ClientError, ErrorInfo, ErrorKind};
pub use mutation::{Mutation, MutationState};
pub use service::BackendService;
pub use watcher::{FetchState, Producer, Watcher};

pub use error::Result;
