//! End-to-end scenarios.

mod crash_safety;
mod filtering;
mod rename_history;
mod run_numbering;
mod time_gap;
