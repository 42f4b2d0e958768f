use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const COMPONENT_BITS: u32 = 21;
const COMPONENT_MASK: u64 = (1 << COMPONENT_BITS) - 1;

/// Three pseudo-random values in `[-1, 1]` derived from `seed` and `id` only.
pub fn stable_triple(seed: u64, id: &str) -> [f32; 3] {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    id.hash(&mut hasher);
    let hash = hasher.finish();

    std::array::from_fn(|component| {
        let bits = (hash >> (component as u32 * COMPONENT_BITS)) & COMPONENT_MASK;
        let unit = bits as f64 / COMPONENT_MASK as f64;
        (unit * 2.0 - 1.0) as f32
    })
}
