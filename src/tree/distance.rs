/// Number of differing positions, or `None` when the lengths differ.
pub fn hamming(a: &str, b: &str) -> Option<usize> {
    if a.chars().count() != b.chars().count() {
        return None;
    }
    Some(a.chars().zip(b.chars()).filter(|(x, y)| x != y).count())
}

/// Mean Hamming distance over every comparable marker pair.
///
/// `None` means no distance: one side has no markers or no pair had equal
/// lengths.
pub fn genetic_distance<A, B>(markers_a: &[A], markers_b: &[B]) -> Option<f32>
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let mut total = 0usize;
    let mut pairs = 0usize;
    for a in markers_a {
        for b in markers_b {
            if let Some(distance) = hamming(a.as_ref(), b.as_ref()) {
                total += distance;
                pairs += 1;
            }
        }
    }
    (pairs > 0).then(|| total as f32 / pairs as f32)
}
