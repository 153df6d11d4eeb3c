//! Shared helpers for unit tests.

pub mod pdf;
pub mod socket_guard;
