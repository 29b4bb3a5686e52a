use rand::{thread_rng, Rng};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Random request code drawn from uppercase letters and digits, easy to type on a phone keypad.
pub fn generate_request_code(length: usize) -> String {
    let mut rng = thread_rng();
    (0..length)
        .map(|_| char::from(CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())]))
        .collect()
}
