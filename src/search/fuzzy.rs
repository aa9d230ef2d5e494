//! String similarity scores on a 0-100 scale
//!
//! `ratio` is the normalized indel similarity: twice the longest common
//! subsequence over the combined length. `partial_ratio` slides the shorter
//! string over the longer one and keeps the best window.

/// Similarity of two whole strings, 0 to 100
pub fn ratio(a: &str, b: &str) -> u32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    char_ratio(&a, &b)
}

/// Best similarity between the shorter string and any equally long window
/// of the longer one, 0 to 100
pub fn partial_ratio(a: &str, b: &str) -> u32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if short.is_empty() {
        return 0;
    }
    if short.len() == long.len() {
        return char_ratio(short, long);
    }

    let mut best = 0;
    for window in long.windows(short.len()) {
        best = best.max(char_ratio(short, window));
        if best == 100 {
            break;
        }
    }
    best
}

fn char_ratio(a: &[char], b: &[char]) -> u32 {
    let total = a.len() + b.len();
    if total == 0 || a.is_empty() || b.is_empty() {
        return 0;
    }
    let common = lcs_len(a, b);
    ((200 * common) as f64 / total as f64).round() as u32
}

/// Length of the longest common subsequence, two-row dynamic programming
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb {
                previous[j] + 1
            } else {
                current[j].max(previous[j + 1])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
