//! # Service Tools
//!
//! Deterministic plumbing behind the agent's tools.
//!
//! ## Modules
//!
//! - `services` - HTTP client for the external marketing services
//! - `payload` - Cleanup of malformed ingest payloads

pub mod payload;
pub mod services;
