//! Fallback tests.
//!
//! Test organization:
//! - strategies.rs: each way of producing the substitute response

mod strategies;
