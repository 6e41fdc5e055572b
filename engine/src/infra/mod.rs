//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: the control-plane gateway,
//! artifact resolution and bundle synthesis, configuration loading, the
//! system clock, tracing setup, and an in-memory control plane.
//!
//! Imports from `crate::domain` and `crate::application` are allowed.

pub mod artifact;
pub mod clock;
pub mod config;
pub mod gateway;
pub mod simulated;
pub mod telemetry;
