//! Tapedeck Sanitization
//!
//! Transforms a freshly captured interaction into the form that is safe to
//! commit: credentials removed, bodies decompressed and pretty-printed,
//! provider-specific URLs scrubbed.

pub mod error;
pub mod sanitizer;

pub use error::{SanitizeError, SanitizeResult};
pub use sanitizer::{InteractionSanitizer, SanitizerConfig, StandardSanitizer};
