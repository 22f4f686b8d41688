//! Utility functions and helpers.

pub mod http;
pub mod time;

use serde::Serialize;

use crate::error::Result;

/// Pretty JSON with four-space indentation, the layout of every file the
/// collector writes.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_pretty_json_indent() {
        let bytes = to_pretty_json(&serde_json::json!({"a": [1]})).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "{\n    \"a\": [\n        1\n    ]\n}"
        );
    }
}
