//! Name similarity scoring on a 0-100 scale.
//!
//! `token_sort_ratio` is order-insensitive: both inputs are split on
//! whitespace, the tokens sorted and re-joined, and the results compared with
//! a normalized Indel similarity (`200 * LCS / (len_a + len_b)`).
//! `name_similarity` runs company names through the key normalizer and folds
//! common legal-form spellings before scoring.

use super::normalize::normalize_name;

/// Legal-form spellings folded to one short token before scoring
const LEGAL_FORMS: &[(&[&str], &str)] = &[
    (&["gesellschaft", "mit", "beschränkter", "haftung"], "gmbh"),
    (&["gesellschaft", "mit", "beschraenkter", "haftung"], "gmbh"),
    (&["mit", "beschränkter", "haftung"], "mbh"),
    (&["mit", "beschraenkter", "haftung"], "mbh"),
    (&["aktiengesellschaft"], "ag"),
    (&["kommanditgesellschaft"], "kg"),
    (&["corporation"], "corp"),
    (&["incorporated"], "inc"),
    (&["limited"], "ltd"),
    (&["company"], "co"),
];

/// Similarity of two company names, 0-100
pub fn name_similarity(a: &str, b: &str) -> f64 {
    token_sort_ratio(&canonical_name(a), &canonical_name(b))
}

/// Order-insensitive token similarity of two strings, 0-100
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    indel_ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn sorted_tokens(s: &str) -> Vec<char> {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ").chars().collect()
}

fn indel_ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

/// Longest common subsequence length, two-row dynamic programme
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let mut prev = vec![0usize; short.len() + 1];
    let mut cur = vec![0usize; short.len() + 1];
    for &lc in long {
        for (j, &sc) in short.iter().enumerate() {
            cur[j + 1] = if lc == sc {
                prev[j] + 1
            } else {
                cur[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[short.len()]
}

fn canonical_name(name: &str) -> String {
    let normalized = normalize_name(name);
    let tokens: Vec<&str> = normalized.split(' ').filter(|t| !t.is_empty()).collect();

    let mut out: Vec<&str> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    'outer: while i < tokens.len() {
        for &(phrase, short) in LEGAL_FORMS {
            if tokens[i..].starts_with(phrase) {
                out.push(short);
                i += phrase.len();
                continue 'outer;
            }
        }
        out.push(tokens[i]);
        i += 1;
    }
    out.join(" ")
}
