//! Behavioural tests for thread groups.
//!
//! These cases drive real worker threads through creation, start, shutdown
//! and termination, checking counts, naming and recorded outcomes.

mod cases_lifecycle_test;

pub mod support;
