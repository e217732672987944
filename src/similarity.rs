//! Edit-distance based name matching used by rename detection.
//!
//! Distances are computed over Unicode scalar values, not bytes, so
//! `similarity("größe", "grösse")` is about characters a reader can see.

/// Best candidate returned by [`find_best_match`].
#[derive(Debug, Clone, PartialEq)]
pub struct Match<'a> {
    /// The matched candidate.
    pub candidate: &'a str,
    /// Its similarity to the target, in `[0, 1]`.
    pub score: f64,
}

/// Minimum number of single-character insertions, deletions and substitutions
/// needed to turn `a` into `b`.
///
/// Uses two rolling rows sized to the shorter input.
///
/// ```
/// use modbreak_core::similarity::distance;
///
/// assert_eq!(distance("kitten", "sitting"), 3);
/// assert_eq!(distance("", "abc"), 3);
/// ```
#[must_use]
pub fn distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    if short.is_empty() {
        return long.len();
    }

    let mut prev: Vec<usize> = (0..=short.len()).collect();
    let mut curr: Vec<usize> = vec![0; short.len() + 1];

    for (i, lc) in long.iter().enumerate() {
        curr[0] = i + 1;
        for (j, sc) in short.iter().enumerate() {
            let substitution = prev[j] + usize::from(lc != sc);
            let deletion = prev[j + 1] + 1;
            let insertion = curr[j] + 1;
            curr[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[short.len()]
}

/// Normalized similarity: `1 - distance / max(len(a), len(b))`.
///
/// Two empty strings are identical, so their similarity is `1.0`.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - distance(a, b) as f64 / longest as f64
}

/// Finds the candidate most similar to `target`.
///
/// The first candidate with the highest score wins ties. Returns `None` when
/// there are no candidates or the best score is below `threshold`.
///
/// ```
/// use modbreak_core::similarity::find_best_match;
///
/// let best = find_best_match("foo", ["bar", "foo", "baz"], 0.85).unwrap();
/// assert_eq!(best.candidate, "foo");
/// assert_eq!(best.score, 1.0);
/// ```
pub fn find_best_match<'a, I>(target: &str, candidates: I, threshold: f64) -> Option<Match<'a>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<Match<'a>> = None;
    for candidate in candidates {
        let score = similarity(target, candidate);
        if best.as_ref().is_none_or(|b| score > b.score) {
            best = Some(Match { candidate, score });
        }
    }
    best.filter(|b| b.score >= threshold)
}
