//! String normalization and similarity.
//!
//! Every function here is pure and allocation-bounded by its inputs, which
//! keeps matching reproducible across runs.

/// Levenshtein edit distance over Unicode scalar values.
#[must_use]
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two DP rows: distances between `a[..i]` and `b[..j]`.
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr: Vec<usize> = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// `1 - distance / max_len`, in [0, 1]. Empty input on either side scores 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn normalized_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

/// Lowercases, drops punctuation and collapses whitespace.
///
/// ```
/// use warmpath::resolution::normalize_name;
///
/// assert_eq!(normalize_name("  Dr. Anne-Marie   O'Neil "), "dr annemarie oneil");
/// ```
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trimmed and lowercased.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Digits only, with a leading `00` international prefix removed.
#[must_use]
pub fn normalize_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    match digits.strip_prefix("00") {
        Some(rest) => rest.to_string(),
        None => digits,
    }
}

/// Trimmed, lowercased, without a leading `@`.
#[must_use]
pub fn normalize_handle(handle: &str) -> String {
    let trimmed = handle.trim();
    trimmed.strip_prefix('@').unwrap_or(trimmed).trim().to_lowercase()
}

/// Best similarity between any pair of normalized names, with the raw values
/// that produced it.
#[must_use]
pub fn best_name_similarity<'a>(
    left: &'a [String],
    right: &'a [String],
) -> Option<(&'a str, &'a str, f64)> {
    let mut best: Option<(&str, &str, f64)> = None;
    for l in left {
        let ln = normalize_name(l);
        for r in right {
            let score = normalized_similarity(&ln, &normalize_name(r));
            if best.map_or(true, |(_, _, b)| score > b) {
                best = Some((l.as_str(), r.as_str(), score));
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("", "ab"), 2);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
        assert_eq!(levenshtein("józef", "jozef"), 1);
    }

    #[test]
    fn similarity_range() {
        assert_eq!(normalized_similarity("alice", "alice"), 1.0);
        assert_eq!(normalized_similarity("", "alice"), 0.0);
        assert_eq!(normalized_similarity("", ""), 0.0);
        let s = normalized_similarity("jonathan", "jonathon");
        assert!((s - 0.875).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&normalized_similarity("abc", "xyz")));
    }

    #[test]
    fn similarity_is_symmetric() {
        for (a, b) in [("maria", "mario"), ("a", "abcd"), ("smith", "smyth")] {
            assert_eq!(normalized_similarity(a, b), normalized_similarity(b, a));
        }
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_name("Jean-Luc  PICARD"), "jeanluc picard");
        assert_eq!(normalize_name(" . "), "");
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
        assert_eq!(normalize_phone("+1 (555) 010-2000"), "15550102000");
        assert_eq!(normalize_phone("0044 20 7946 0000"), "442079460000");
        assert_eq!(normalize_handle(" @AnaDev "), "anadev");
    }

    #[test]
    fn best_name_pair() {
        let left = vec!["Bob Smith".to_string(), "Robert Smith".to_string()];
        let right = vec!["robert smith".to_string()];
        let (l, r, score) = best_name_similarity(&left, &right).unwrap();
        assert_eq!(l, "Robert Smith");
        assert_eq!(r, "robert smith");
        assert_eq!(score, 1.0);
        assert!(best_name_similarity(&[], &right).is_none());
    }
}
