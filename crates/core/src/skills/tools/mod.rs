//! # Radkit-Compatible Tools
//!
//! Tools annotated with `#[tool]` macro for use by the Influenxers agent.

pub mod marketing_tools;
