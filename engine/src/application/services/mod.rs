//! Application services: use-case orchestration functions.
//!
//! Each service function accepts port trait bounds so callers can inject
//! real or mock implementations.

pub mod app;
pub mod polling;
pub mod retry;
pub mod route;
pub mod service;
pub mod space;
