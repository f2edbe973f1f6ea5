//! Core types and trait definitions for the mailtrace tracking service.
//!
//! No HTTP or database code lives here. The store backend and the server
//! both depend on this crate.

pub mod debounce;
pub mod email;
pub mod error;
pub mod event;
pub mod stats;
pub mod store;
pub mod timestamp;

pub use error::{Error, Result};
