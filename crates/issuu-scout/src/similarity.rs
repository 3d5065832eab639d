//! Block-matching string similarity.
//!
//! Ratcliff/Obershelp: find the longest common contiguous block, recurse on
//! the unmatched pieces to its left and right, and score
//! `2 * matched / (len(a) + len(b))`. Ties between equally long blocks go to
//! the one starting earliest in `a`, then earliest in `b`, so results are
//! fully deterministic.

/// Similarity in `[0, 1]` between two strings, ignoring case.
///
/// Two empty strings are identical and score `1.0`.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let matched = matched_chars(&a, &b);
    2.0 * matched as f64 / total as f64
}

/// Sum of the lengths of all matching blocks.
fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }

    matched
}

/// Longest block `a[i..i+k] == b[j..j+k]` inside the given windows.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    let width = bhi - blo;
    // run[x] = length of the match ending at a[i-1], b[blo+x-1]
    let mut prev = vec![0usize; width + 1];
    let mut curr = vec![0usize; width + 1];

    for i in alo..ahi {
        for x in 0..width {
            let j = blo + x;
            curr[x + 1] = if a[i] == b[j] { prev[x] + 1 } else { 0 };
            let k = curr[x + 1];
            if k > best_k {
                best_i = i + 1 - k;
                best_j = j + 1 - k;
                best_k = k;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_i, best_j, best_k)
}
