use sha2::{Digest, Sha256};

/// Number of hex digits kept for patch `index` lines.
pub const SHORT_HASH_LEN: usize = 7;

/// Full SHA-256 of `text`, lowercase hex.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Abbreviated content fingerprint, in the spirit of git's short object ids.
///
/// These are not git blob ids, so tools that resolve `index` lines against an
/// object database will not find them.
pub fn short_hash(text: &str) -> String {
    let mut hash = content_hash(text);
    hash.truncate(SHORT_HASH_LEN);
    hash
}
