//! Property-based tests for the pipeline stages.
//!
//! Run with: cargo test --test property_tests
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold across stage configurations.

pub mod retry;
pub mod timeout;
