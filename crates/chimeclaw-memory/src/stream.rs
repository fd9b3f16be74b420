//! Stable chat-stream identifiers.

use sha2::{Digest, Sha256};

/// Stream id for a private chat: hex SHA-256 of `"{platform}_{user_id}"`.
/// Same inputs always give the same id, across restarts and machines.
pub fn private_stream_id(platform: &str, user_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{platform}_{user_id}").as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_and_distinct() {
        let a = private_stream_id("qq", "42");
        assert_eq!(a, private_stream_id("qq", "42"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, private_stream_id("qq", "43"));
        assert_ne!(a, private_stream_id("telegram", "42"));
    }
}
