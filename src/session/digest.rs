use sha2::{Digest, Sha256};

/// Session id for a session starting at `timestamp`
///
/// Lowercase hex SHA-256 of the timestamp text. Two keys starting a session
/// at the same instant share an id unless `salt` (the correlation key) is
/// mixed in.
pub fn session_digest(timestamp: &str, salt: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(timestamp.as_bytes());
    if let Some(salt) = salt {
        hasher.update([0x1fu8]);
        hasher.update(salt.as_bytes());
    }
    hex::encode(hasher.finalize())
}
