// ABOUTME: Typed PostgreSQL client-tool operations run inside the destination container
// ABOUTME: Builds createdb/pg_dump/psql/pg_restore invocations and classifies their output

pub mod diagnostics;
pub mod tools;

pub use diagnostics::{classify, Diagnostics};
pub use tools::{CreateOutcome, PostgresTools};
