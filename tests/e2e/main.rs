//! End-to-end scenarios for the session logging subsystem.

mod harness;
mod scenarios;
