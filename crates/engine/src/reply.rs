// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Suppresses host-runtime replies that read as a surfaced transport/model
//! error rather than a genuine answer, so a flaky upstream call doesn't echo
//! "rate limited" back into the shared message stream.

/// Phrases that, if two or more appear in a reply, mark it as an error echo
/// instead of a real response.
const ERROR_PHRASES: &[&str] = &[
    "http 4",
    "http 5",
    "rate limit",
    "rate-limit",
    "invalid input",
    "invalid_input",
    "context length",
    "context_length",
    "context window",
    "too many requests",
    "internal server error",
    "bad gateway",
    "service unavailable",
    "gateway timeout",
];

/// Two or more [`ERROR_PHRASES`] hits in the same reply suppress it.
pub fn is_suppressed_error_phrase(text: &str) -> bool {
    let lower = text.to_lowercase();
    ERROR_PHRASES.iter().filter(|p| lower.contains(*p)).count() >= 2
}

#[cfg(test)]
#[path = "reply_tests.rs"]
mod tests;
