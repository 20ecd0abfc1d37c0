// base58.rs - Positional base-58 encoding of sequence indices

/// Digits and letters without the look-alikes `0`, `O`, `I` and `l`
pub const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

const BASE: u64 = ALPHABET.len() as u64;

/// Encode an index, most significant digit first; `0` encodes to `"1"`
pub fn encode(mut value: u64) -> String {
    if value == 0 {
        return (ALPHABET[0] as char).to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ALPHABET[(value % BASE) as usize] as char);
        value /= BASE;
    }
    digits.iter().rev().collect()
}

/// Inverse of [`encode`]; `None` on an empty string, a foreign symbol or overflow
pub fn decode(encoded: &str) -> Option<u64> {
    if encoded.is_empty() {
        return None;
    }
    encoded.bytes().try_fold(0u64, |acc, byte| {
        let digit = ALPHABET.iter().position(|&c| c == byte)? as u64;
        acc.checked_mul(BASE)?.checked_add(digit)
    })
}
