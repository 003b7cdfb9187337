//! E2E test harness for the session logger.
//!
//! This module contains test infrastructure with intentionally unused
//! helpers that will be used as more e2e scenarios are written.

#![allow(dead_code)]

pub mod scenario;
pub mod workspace;

// Re-export commonly used types
pub use scenario::Scenario;
pub use workspace::TestWorkspace;
