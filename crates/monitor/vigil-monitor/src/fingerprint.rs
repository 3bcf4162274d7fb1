//! Error fingerprinting for deduplication.
//!
//! A fingerprint collapses occurrences of the same underlying error into one
//! tracked report. Volatile details (line numbers deep in a stack, timestamps,
//! free-form extras) are deliberately excluded so repeated failures hash to
//! the same identity.

use crate::tracker::ErrorContext;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use sha3::{Digest, Sha3_256};
use vigil_core::utils::string;

/// Length of a generated fingerprint, in characters.
pub const FINGERPRINT_LEN: usize = 32;

/// How much of the stack's first line participates in the fingerprint.
const STACK_CONTEXT_LEN: usize = 100;

/// The reduced context that participates in fingerprinting. Free-form extras
/// and per-session fields are excluded on purpose.
#[derive(Serialize)]
struct FingerprintContext<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    component: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    operation: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent_type: Option<&'a str>,
}

/// Derive a stable identity from an error's message, stack, and context.
///
/// The same (message, stack, context) triple always yields the same
/// fingerprint; the message is trimmed and lowercased first, and only the
/// first line of the stack (truncated to 100 characters) is considered.
pub fn generate(message: &str, stack: Option<&str>, context: Option<&ErrorContext>) -> String {
    let normalized_message = message.trim().to_lowercase();

    let stack_context = stack
        .map(|s| string::truncate_chars(string::first_line(s).trim(), STACK_CONTEXT_LEN))
        .unwrap_or("");

    let context_string = context
        .map(|c| {
            let reduced = FingerprintContext {
                component: c.component.as_deref(),
                operation: c.operation.as_deref(),
                agent_type: c.agent_type.as_deref(),
            };
            serde_json::to_string(&reduced).unwrap_or_default()
        })
        .unwrap_or_default();

    let seed = format!("{normalized_message}|{stack_context}|{context_string}");

    let digest = Sha3_256::digest(seed.as_bytes());
    let mut encoded = BASE64.encode(digest);
    encoded.truncate(FINGERPRINT_LEN);
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn context(component: Option<&str>, operation: Option<&str>) -> ErrorContext {
        ErrorContext {
            component: component.map(str::to_owned),
            operation: operation.map(str::to_owned),
            ..ErrorContext::default()
        }
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = generate("disk write failed", Some("at write (fs.rs:10)"), None);
        let b = generate("disk write failed", Some("at write (fs.rs:10)"), None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_length() {
        let fp = generate("any error", None, None);
        assert_eq!(fp.chars().count(), FINGERPRINT_LEN);
    }

    #[test]
    fn test_message_is_normalized() {
        let a = generate("  Disk Write FAILED  ", None, None);
        let b = generate("disk write failed", None, None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_messages_differ() {
        let a = generate("disk write failed", None, None);
        let b = generate("disk read failed", None, None);
        assert_ne!(a, b);
    }

    #[test]
    fn test_only_first_stack_line_matters() {
        let a = generate("boom", Some("at f (a.rs:1)\nat g (b.rs:2)"), None);
        let b = generate("boom", Some("at f (a.rs:1)\nat h (c.rs:99)"), None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_stack_first_line_is_truncated() {
        let long_line = "x".repeat(200);
        let truncated = &long_line[..100];
        let a = generate("boom", Some(&long_line), None);
        let b = generate("boom", Some(truncated), None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_context_influences_fingerprint() {
        let a = generate("boom", None, Some(&context(Some("editor"), None)));
        let b = generate("boom", None, Some(&context(Some("terminal"), None)));
        assert_ne!(a, b);
    }

    #[test]
    fn test_volatile_context_fields_are_ignored() {
        let mut with_extras = context(Some("editor"), Some("save"));
        with_extras.conversation_id = Some("c-123".into());
        with_extras
            .extra
            .insert("attempt".into(), serde_json::json!(7));

        let plain = context(Some("editor"), Some("save"));

        assert_eq!(
            generate("boom", None, Some(&with_extras)),
            generate("boom", None, Some(&plain))
        );
    }

    proptest! {
        #[test]
        fn prop_fingerprint_is_stable(message in ".{0,64}", stack in proptest::option::of(".{0,128}")) {
            let a = generate(&message, stack.as_deref(), None);
            let b = generate(&message, stack.as_deref(), None);
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.chars().count(), FINGERPRINT_LEN);
        }
    }
}
