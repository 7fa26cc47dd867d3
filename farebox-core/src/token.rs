use rand::rngs::OsRng;
use rand::RngCore;

/// Capability tokens are 32 bytes of OS randomness, hex-encoded.
///
/// They guard the unauthenticated status lookup and the boarding QR check,
/// so they come from the OS CSPRNG, never a seeded generator. Collisions are
/// not checked here; the store enforces a uniqueness constraint as a second
/// line of defense.
pub const TOKEN_BYTES: usize = 32;

pub fn generate() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_64_hex_chars() {
        let token = generate();
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_are_distinct() {
        let a = generate();
        let b = generate();
        assert_ne!(a, b);
    }
}
