//! Ratcliff/Obershelp sequence similarity.
//!
//! `ratio = 2 * M / T`, where `M` is the number of characters in the
//! recursively found longest common blocks and `T` the combined length.
//! Ties between equally long blocks prefer the earliest position in `a`, then
//! in `b`, so results match the classic `SequenceMatcher` behavior for short
//! strings.

/// Longest common block in `a[alo..ahi]` x `b[blo..bhi]` as `(i, j, size)`.
fn longest_match(
    a: &[char],
    b: &[char],
    (alo, ahi): (usize, usize),
    (blo, bhi): (usize, usize),
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // lengths[j + 1] = length of the common suffix ending at a[i], b[j]
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            curr[j + 1] = if a[i] == b[j] {
                let k = if j > blo { prev[j] } else { 0 } + 1;
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
                k
            } else {
                0
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_i, best_j, best_size)
}

fn matching_characters(
    a: &[char],
    b: &[char],
    a_range: (usize, usize),
    b_range: (usize, usize),
) -> usize {
    let (i, j, k) = longest_match(a, b, a_range, b_range);
    if k == 0 {
        return 0;
    }
    k + matching_characters(a, b, (a_range.0, i), (b_range.0, j))
        + matching_characters(a, b, (i + k, a_range.1), (j + k, b_range.1))
}

/// Similarity ratio in `[0, 1]`. Two empty strings are identical.
#[must_use]
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matches = matching_characters(&a, &b, (0, a.len()), (0, b.len()));
    #[allow(clippy::cast_precision_loss)]
    {
        2.0 * matches as f64 / total as f64
    }
}

/// The best candidate whose ratio against `word` reaches `cutoff`.
///
/// Ties on score prefer the lexicographically greater candidate.
#[must_use]
pub fn closest_match<'a, I>(word: &str, candidates: I, cutoff: f64) -> Option<(&'a str, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .map(|candidate| (candidate, sequence_ratio(candidate, word)))
        .filter(|(_, score)| *score >= cutoff)
        .max_by(|(ca, sa), (cb, sb)| sa.total_cmp(sb).then_with(|| ca.cmp(cb)))
}
