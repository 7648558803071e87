//! Tapedeck Request Matching
//!
//! Decides whether a live HTTP request is equivalent to a recorded one.
//! Checks run in a fixed order and stop at the first difference:
//! method, URL, headers, body.

pub mod live;
pub mod matcher;

pub use live::LiveRequest;
pub use matcher::{BodyRule, HeaderRule, Matcher, MatcherConfig, Mismatch};
