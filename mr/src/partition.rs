//! Key partitioning and ordering shared by the map and reduce sides.

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// FNV-1a 32-bit hash of `key`, with the sign bit cleared.
pub fn ihash(key: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in key.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash & 0x7fff_ffff
}

/// Reduce bucket owning `key`. `n_reduce` must be non-zero.
pub fn bucket(key: &str, n_reduce: usize) -> usize {
    ihash(key) as usize % n_reduce
}

/// Stable sort by key, then collapse runs of equal keys.
/// Values keep their relative order within each group.
pub fn group_by_key(mut records: Vec<(String, String)>) -> Vec<(String, Vec<String>)> {
    records.sort_by(|a, b| a.0.cmp(&b.0));

    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for (key, value) in records {
        match groups.last_mut() {
            Some((last, values)) if *last == key => values.push(value),
            _ => groups.push((key, vec![value])),
        }
    }
    groups
}
