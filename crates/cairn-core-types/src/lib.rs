//! Core types shared across Cairn facilities
//!
//! This crate provides the canonical field keys and event names used by
//! both the error facility and the structured logging macros, so every
//! crate in the workspace emits the same shape of event.

pub mod schema;
