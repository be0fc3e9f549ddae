//! Property-based tests for the dbvault core library

mod concurrency_tests;
mod config_tests;
mod store_tests;
