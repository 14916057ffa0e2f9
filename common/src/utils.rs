// Common Crate - utils.rs
// wallet-relay/common/src/utils.rs
use rand::Rng;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Setup tracing for consistent logging across the relay
pub fn setup_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Alphabet for session ids and secrets: 32 symbols, excludes 0, O, 1 and I
/// so an id survives being read aloud or retyped from a QR scan.
pub const ID_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generate a random string of `length` characters over [`ID_ALPHABET`].
///
/// Each character is one byte from the thread-local CSPRNG mapped modulo 32
/// into the alphabet.
pub fn generate_id(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| ID_ALPHABET[(rng.gen::<u8>() % 32) as usize] as char)
        .collect()
}

/// Constant-time string equality, used for session secret checks.
///
/// Length is compared first (it is not secret); the body comparison touches
/// every byte regardless of where the first mismatch occurs.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_length() {
        assert_eq!(generate_id(4).len(), 4);
        assert_eq!(generate_id(16).len(), 16);
    }

    #[test]
    fn test_generate_id_alphabet() {
        let id = generate_id(256);
        for c in id.chars() {
            assert!(
                ID_ALPHABET.contains(&(c as u8)),
                "character {} outside alphabet",
                c
            );
        }
    }

    #[test]
    fn test_generate_id_excludes_confusable_chars() {
        let id = generate_id(1024);
        for banned in ['0', 'O', '1', 'I'] {
            assert!(!id.contains(banned), "found confusable char {}", banned);
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let a = generate_id(16);
        let b = generate_id(16);
        assert_ne!(a, b);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("ABCD", "ABCD"));
        assert!(!constant_time_eq("ABCD", "ABCE"));
        assert!(!constant_time_eq("ABCD", "ABC"));
        assert!(constant_time_eq("", ""));
    }
}
