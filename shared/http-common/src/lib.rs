//! Shared HTTP utilities for the work-ledger workspace.
//!
//! Framework-agnostic error bodies used by api-server.

// ============================================================================
// JSON Response Helpers
// ============================================================================

/// Create a structured error JSON with a custom message.
///
/// Returns: `{"error": {"code": "<code>", "message": "<message>"}}`
pub fn json_error_with_message(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({"error": {"code": code, "message": message}})
}

/// Whether `bytes` parse as a JSON document. Used to pick a content type for
/// raw ledger payloads.
pub fn is_json(bytes: &[u8]) -> bool {
    !bytes.is_empty() && serde_json::from_slice::<serde_json::Value>(bytes).is_ok()
}
