//! Random identifiers: room codes and question ids.

use quizwire_protocol::RoomCode;
use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a random six-character room code over `[A-Z0-9]`.
///
/// Uniqueness is not checked here. The registry rejects a code that is
/// already live and the coordinator retries.
pub fn generate_code() -> RoomCode {
    let mut rng = rand::rng();
    let code: String = (0..RoomCode::LEN)
        .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
        .collect();
    RoomCode::normalize(&code)
}

/// Generates a 16-character hex id for a question round.
pub(crate) fn generate_question_id() -> String {
    let bytes: [u8; 8] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_well_formed() {
        for _ in 0..200 {
            let code = generate_code();
            assert!(code.is_well_formed(), "bad code {code}");
        }
    }

    #[test]
    fn test_generated_codes_vary() {
        let a = generate_code();
        let b = generate_code();
        let c = generate_code();
        // 36^6 possibilities: three equal draws in a row means a broken RNG.
        assert!(!(a == b && b == c));
    }

    #[test]
    fn test_question_id_is_hex() {
        let id = generate_question_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
