// Shared test support code for thread group tests.

pub mod common;

pub use common::*;
