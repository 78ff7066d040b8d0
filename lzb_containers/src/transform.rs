/// Bitwise-NOT every byte in place.
///
/// Script containers store their decoded sections inverted; applying this
/// twice restores the input.
pub fn invert_bytes(bytes: &mut [u8]) {
    for b in bytes.iter_mut() {
        *b = !*b;
    }
}

/// Inverted copy of `bytes`.
pub fn inverted(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().map(|b| !b).collect()
}
