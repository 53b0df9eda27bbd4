//! End-to-end export suites.

mod determinism;
mod failures;
mod scenario;
mod truncation;
