//! Core type definitions for vaultic.
//!
//! This crate defines the fundamental, store-agnostic types used throughout
//! the persistence core:
//! - [`Cid`] — the 128-bit compact identifier (22-char URL-safe base64)
//! - [`CoreConfig`] — process-wide static configuration
//!
//! All domain-specific record types belong to callers; the core only ever
//! sees identifiers, field maps and descriptor flags.

mod cid;
mod config;

pub use cid::{Cid, CidError, CID_LEN, CID_STR_LEN};
pub use config::{
    ConfigError, CoreConfig, DEFAULT_OFFLOAD_THRESHOLD_BYTES, DEFAULT_THREAD_LIMIT_PERCENTAGE,
    MIN_OFFLOAD_THRESHOLD_BYTES,
};
