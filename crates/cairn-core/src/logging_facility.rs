//! Structured logging facility for Cairn
//!
//! - Single initialization point via `init(profile)`
//! - Boundary macros (`log_op_start!`, `log_op_end!`, `log_op_error!`) that
//!   every public repository operation emits exactly once per outcome
//! - Test capture mode for deterministic assertions
//!
//! ```rust
//! use cairn_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```
//!
//! Lower layers (store, content staging) log internal detail with
//! `tracing::debug!`/`tracing::warn!` only; the engine owns the boundary
//! events.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
