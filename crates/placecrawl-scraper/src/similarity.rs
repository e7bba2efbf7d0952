//! Candidate scoring.

/// Weight of the name similarity in a candidate score; the address overlap
/// takes the rest.
pub const NAME_WEIGHT: f64 = 0.8;
pub const ADDRESS_WEIGHT: f64 = 0.2;

/// Ratcliff/Obershelp similarity: `2·M / (|a| + |b|)` where `M` is the
/// number of characters in matching blocks found by recursively taking the
/// longest common substring. Two empty strings are identical.
#[must_use]
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = matching_chars(&a, &b);
    #[allow(clippy::cast_precision_loss)] // string lengths are far below 2^52
    let ratio = (2 * matched) as f64 / total as f64;
    ratio
}

/// Share of the whitespace-separated tokens of `hint` that occur somewhere
/// in `address`. `0.0` for an empty hint.
#[must_use]
pub fn address_token_overlap(hint: &str, address: &str) -> f64 {
    let tokens: Vec<&str> = hint.split_whitespace().collect();
    if tokens.is_empty() {
        return 0.0;
    }
    let found = tokens.iter().filter(|t| address.contains(*t)).count();
    #[allow(clippy::cast_precision_loss)] // token counts are tiny
    let overlap = found as f64 / tokens.len() as f64;
    overlap
}

/// Blended candidate score in `[0, 1]`.
#[must_use]
pub fn score(origin_name: &str, location_hint: &str, name: &str, address: &str) -> f64 {
    NAME_WEIGHT * name_similarity(origin_name, name)
        + ADDRESS_WEIGHT * address_token_overlap(location_hint, address)
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, len) = longest_match(a, b, alo, ahi, blo, bhi);
        if len == 0 {
            continue;
        }
        matched += len;
        pending.push((alo, i, blo, j));
        pending.push((i + len, ahi, j + len, bhi));
    }
    matched
}

/// Longest common substring of `a[alo..ahi]` and `b[blo..bhi]`, earliest in
/// `a` then earliest in `b` on ties. Returns `(i, j, len)`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0);
    // lengths[j] = length of the common suffix ending at a[i-1], b[j-1]
    let mut prev = vec![0usize; bhi - blo + 1];
    let mut curr = vec![0usize; bhi - blo + 1];
    for i in alo..ahi {
        for j in blo..bhi {
            let k = j - blo + 1;
            curr[k] = if a[i] == b[j] { prev[k - 1] + 1 } else { 0 };
            let len = curr[k];
            if len > best_len {
                best_len = len;
                best_i = i + 1 - len;
                best_j = j + 1 - len;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    (best_i, best_j, best_len)
}
