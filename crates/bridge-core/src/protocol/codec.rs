//! Line codec for relayed JSON-RPC frames.
//!
//! Wire format, identical on both transports:
//! ```text
//! <one JSON document, no embedded newline>\n
//! ```
//! The bridge never inspects the document.  It decodes only far enough to
//! know the text is well-formed JSON, then re-encodes the same structure on
//! the other side.  Key order is preserved (serde_json `preserve_order`).
//!
//! Line framing belongs to the transport: [`encode_frame`] never appends a
//! newline, and [`decode_frame`] expects the terminator to be stripped
//! already.

use serde_json::Value;
use thiserror::Error;

/// One relayed message: an opaque, arbitrarily nested JSON document.
pub type StructuredMessage = Value;

/// Errors that can occur while decoding a frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The line is not a valid JSON document.
    ///
    /// Callers log and discard the line; a malformed frame never terminates
    /// the relay.
    #[error("malformed frame at line {line}, column {column}: {reason}")]
    MalformedFrame {
        /// Human-readable parser message.
        reason: String,
        /// 1-based line reported by the parser (always 1 for a single frame).
        line: usize,
        /// 1-based column where parsing failed.
        column: usize,
    },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes one line of text into a [`StructuredMessage`].
///
/// Leading and trailing whitespace (including a stray `\r` from CRLF input)
/// is accepted.
///
/// # Errors
///
/// Returns [`CodecError::MalformedFrame`] when the text is not a single,
/// complete JSON document.
///
/// # Examples
///
/// ```rust
/// use bridge_core::protocol::{decode_frame, encode_frame};
///
/// let msg = decode_frame(r#"{"jsonrpc":"2.0","method":"ping","id":1}"#).unwrap();
/// assert_eq!(encode_frame(&msg), r#"{"jsonrpc":"2.0","method":"ping","id":1}"#);
/// assert!(decode_frame("{not json").is_err());
/// ```
pub fn decode_frame(line: &str) -> Result<StructuredMessage, CodecError> {
    serde_json::from_str(line).map_err(|e| CodecError::MalformedFrame {
        reason: e.to_string(),
        line: e.line(),
        column: e.column(),
    })
}

/// Encodes a [`StructuredMessage`] as one line of compact JSON text.
///
/// Infallible: a `Value` always has string keys, so compact serialization
/// cannot fail.  JSON string escaping guarantees the output contains no raw
/// newline, which keeps line framing intact.
pub fn encode_frame(message: &StructuredMessage) -> String {
    // `Display` for `Value` is the compact serializer.
    message.to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_jsonrpc_request() {
        // Arrange
        let line = r#"{"jsonrpc":"2.0","method":"tools/list","id":7}"#;

        // Act
        let msg = decode_frame(line).unwrap();

        // Assert
        assert_eq!(msg["method"], "tools/list");
        assert_eq!(msg["id"], 7);
    }

    #[test]
    fn test_decode_tolerates_trailing_carriage_return() {
        let msg = decode_frame("{\"id\":1}\r").unwrap();
        assert_eq!(msg, json!({"id": 1}));
    }

    #[test]
    fn test_decode_truncated_document_is_malformed() {
        let result = decode_frame(r#"{"jsonrpc":"2.0","#);
        assert!(matches!(result, Err(CodecError::MalformedFrame { .. })));
    }

    #[test]
    fn test_decode_two_documents_on_one_line_is_malformed() {
        // Each frame is exactly one document; trailing content is rejected.
        let result = decode_frame(r#"{"id":1} {"id":2}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_empty_line_is_malformed() {
        assert!(decode_frame("").is_err());
    }

    #[test]
    fn test_malformed_frame_reports_column() {
        let err = decode_frame("[1,2,}").unwrap_err();
        let CodecError::MalformedFrame { line, column, .. } = err;
        assert_eq!(line, 1);
        assert!(column > 0);
    }

    #[test]
    fn test_encode_preserves_key_order() {
        // Arrange: keys deliberately out of alphabetical order
        let line = r#"{"method":"x","jsonrpc":"2.0","id":3,"params":{"z":1,"a":2}}"#;

        // Act
        let encoded = encode_frame(&decode_frame(line).unwrap());

        // Assert: the relay must not reshuffle the document
        assert_eq!(encoded, line);
    }

    #[test]
    fn test_encode_escapes_embedded_newlines() {
        let msg = json!({"params": {"text": "line one\nline two"}});
        let encoded = encode_frame(&msg);
        assert!(!encoded.contains('\n'), "frame must stay on one line");
        assert_eq!(decode_frame(&encoded).unwrap(), msg);
    }
}
