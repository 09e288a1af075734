// ABOUTME: Library root for the PostgreSQL container cloner
// ABOUTME: Exposes the clone orchestrator and its container/tool boundaries

pub mod clone;
pub mod config;
pub mod connection;
pub mod container;
pub mod error;
pub mod executor;
pub mod postgres;

pub use clone::{CloneResult, DatabaseCloner, DestinationDescriptor, SourceDescriptor};
pub use config::Config;
pub use error::{ClonerError, Stage};
