// ABOUTME: Clone orchestration: validation, progress tracking and the five-stage pipeline
// ABOUTME: Public entry points are clone_database, get_progress and cancel_clone

pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod validation;

pub use models::{CloneDetails, CloneResult, DestinationDescriptor, SourceDescriptor};
pub use orchestrator::DatabaseCloner;
pub use progress::{JobId, Milestone, ProgressTracker};
