//! Human-readable dump of an unmatched request

use std::fmt::Write;
use tapedeck_core::HeaderSet;
use tapedeck_matching::LiveRequest;

/// Describe `live` for a miss diagnostic, hiding values of `redacted` headers
pub fn request_details(live: &LiveRequest, redacted: &HeaderSet) -> String {
    let mut out = String::new();

    out.push_str("\n--- Actual Request Details ---\n");
    let _ = writeln!(out, "Method:      {}", live.method);
    let _ = writeln!(out, "Path:        {}", live.path());
    let _ = writeln!(out, "Query:       {}", live.query().unwrap_or(""));

    out.push_str("\nHeaders:\n");
    for (name, values) in live.headers.iter() {
        if redacted.contains(name) {
            let _ = writeln!(out, "  {}: [REDACTED]", name);
            continue;
        }
        for value in values {
            let _ = writeln!(out, "  {}: {}", name, value);
        }
    }

    out.push_str("\nBody:\n");
    let body = String::from_utf8_lossy(&live.body);
    let trimmed = body.trim();
    if live.body.is_empty() {
        out.push_str("  <empty>\n");
    } else if trimmed.starts_with('{') || trimmed.starts_with('[') {
        let _ = writeln!(out, "  {}", body);
    } else {
        let _ = writeln!(out, "  {:?}", body);
    }

    out.push_str("\n--- End Request Details ---\n");
    out
}
