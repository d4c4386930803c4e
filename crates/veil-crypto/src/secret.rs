//! Random share secrets
//!
//! Secrets are read aloud, pasted into chats and typed on phones, so the
//! alphabet drops characters that are easy to confuse (0/O, 1/l/I).

use rand::Rng;
use secrecy::SecretString;

const SECRET_ALPHABET: &[u8] = b"23456789abcdefghijkmnpqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ";

/// Generate a random secret of `len` characters.
pub fn generate_secret(len: usize) -> SecretString {
    let mut rng = rand::thread_rng();
    let secret: String = (0..len)
        .map(|_| SECRET_ALPHABET[rng.gen_range(0..SECRET_ALPHABET.len())] as char)
        .collect();
    SecretString::from(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_secret_length_and_alphabet() {
        let secret = generate_secret(24);
        let s = secret.expose_secret();
        assert_eq!(s.len(), 24);
        assert!(s.bytes().all(|b| SECRET_ALPHABET.contains(&b)));
        assert!(!s.contains(['0', 'O', '1', 'l', 'I']));
    }

    #[test]
    fn test_secrets_differ() {
        let a = generate_secret(16);
        let b = generate_secret(16);
        assert_ne!(a.expose_secret(), b.expose_secret());
    }
}
