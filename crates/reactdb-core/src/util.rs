//! Small helpers shared across the crate.

/// Deterministic string hash.
///
/// Multiplies by 31 and adds each UTF-16 code unit with 32-bit wrapping, then
/// takes the absolute value.
pub fn hash(input: &str) -> u32 {
    let mut hash: i32 = 0;
    for unit in input.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(unit as i32);
    }
    hash.unsigned_abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_known_values() {
        assert_eq!(hash(""), 0);
        assert_eq!(hash(" "), 32);
        assert_eq!(hash("  "), 1024);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let text = "SELECT Task WHERE _id = 'a long enough key to overflow'";
        assert_eq!(hash(text), hash(text));
        assert_ne!(hash("Task"), hash("Project"));
    }
}
