//! Name hashing used to derive stable pseudo-random values.

/// Polynomial rolling hash (`h = h * 31 + unit`) over UTF-16 code units,
/// wrapped to a signed 32-bit integer.
pub fn name_hash(input: &str) -> i32 {
    input
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32))
}

/// Hash of `name` with `index` appended, scaled into `[0, 1]`.
pub fn seeded_unit(name: &str, index: u32) -> f64 {
    let hash = name_hash(&format!("{name}{index}"));
    let magnitude = (hash as i64).abs() as f64;
    (magnitude / i32::MAX as f64).min(1.0)
}

/// The first `N` seeded values for a name (indices `0..N`).
pub fn seeded_values<const N: usize>(name: &str) -> [f64; N] {
    let mut values = [0.0; N];
    for (index, value) in values.iter_mut().enumerate() {
        *value = seeded_unit(name, index as u32);
    }
    values
}
