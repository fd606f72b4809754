//! Client library for the MMLink messaging-bot backend
//!
//! Wraps the backend REST API in a typed client ([`client::BackendApi`]),
//! binds resources to observable fetch state through background watchers
//! ([`client::Watcher`]), and runs one-shot operations through
//! [`client::Mutation`]. The `mmlink` binary is a thin CLI over the same
//! pieces.

pub mod client;
pub mod config;
pub mod domain;
pub mod id;
pub mod logging;
pub mod result;

pub use client::{
    BackendApi, BackendService, ClientConfig, ClientError, ErrorInfo, ErrorKind, FetchState,
    Mutation, Producer, WatchOptions, Watcher,
};
