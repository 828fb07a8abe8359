//! Shared domain models for the marketplace order management system
//!
//! This crate holds the entity structs and status enums used by the
//! `oms-server` engine. It is deliberately free of storage, capability and
//! engine concerns so that boundary layers (HTTP handlers, scheduled jobs)
//! can depend on the model types alone.

pub mod models;

pub use models::*;
