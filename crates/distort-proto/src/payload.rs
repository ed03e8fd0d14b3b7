/// Multi-field payload encoding used by every dialogue built on top of the
/// frame codec: ASCII fields joined with `&` (spec §6.1).
pub fn join(fields: &[&str]) -> Vec<u8> {
    fields.join("&").into_bytes()
}

/// Split a frame's payload bytes back into its `&`-separated fields.
/// Non-UTF8 payloads split into zero fields rather than panicking, since a
/// malformed peer should produce a validation failure, not a crash.
pub fn split(data: &[u8]) -> Vec<String> {
    match std::str::from_utf8(data) {
        Ok(text) => text.split('&').map(str::to_string).collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_and_splits_fields() {
        let encoded = join(&["alice", "127.0.0.1", "9000"]);
        assert_eq!(encoded, b"alice&127.0.0.1&9000");
        assert_eq!(split(&encoded), vec!["alice", "127.0.0.1", "9000"]);
    }

    #[test]
    fn invalid_utf8_splits_to_empty() {
        assert!(split(&[0xFF, 0xFE]).is_empty());
    }
}
