use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use super::similarity::name_similarity;
use crate::constants::DEFAULT_SIMILARITY_THRESHOLD;
use crate::error::{PipelineError, Result};
use crate::types::Observation;

/// Scores two company names on a 0-100 scale
pub trait NameScorer {
    fn score(&self, a: &str, b: &str) -> f64;
}

impl<F> NameScorer for F
where
    F: Fn(&str, &str) -> f64,
{
    fn score(&self, a: &str, b: &str) -> f64 {
        self(a, b)
    }
}

/// Default scorer: legal-form aware token sort ratio
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSortScorer;

impl NameScorer for TokenSortScorer {
    fn score(&self, a: &str, b: &str) -> f64 {
        name_similarity(a, b)
    }
}

/// Counts from one deduplication run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
    pub input: usize,
    pub exact_removed: usize,
    pub fuzzy_removed: usize,
}

impl DedupStats {
    pub fn survivors(&self) -> usize {
        self.input - self.exact_removed - self.fuzzy_removed
    }
}

/// Two-pass duplicate elimination.
///
/// The exact pass keeps the chronologically last observation of every cluster
/// key. The fuzzy pass then groups the survivors by registration number alone
/// and, walking each group in input order, removes any later member whose name
/// scores at or above the threshold against an earlier survivor.
pub struct Deduplicator<S = TokenSortScorer> {
    threshold: u8,
    scorer: S,
}

impl Deduplicator<TokenSortScorer> {
    pub fn new(threshold: u8) -> Result<Self> {
        Self::with_scorer(threshold, TokenSortScorer)
    }
}

impl Default for Deduplicator<TokenSortScorer> {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            scorer: TokenSortScorer,
        }
    }
}

impl<S: NameScorer> Deduplicator<S> {
    pub fn with_scorer(threshold: u8, scorer: S) -> Result<Self> {
        if threshold > 100 {
            return Err(PipelineError::Config(format!(
                "similarity threshold must be between 0 and 100, got {}",
                threshold
            )));
        }
        Ok(Self { threshold, scorer })
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Remove duplicates, returning the survivors in input order
    pub fn dedupe(&self, observations: Vec<Observation>) -> (Vec<Observation>, DedupStats) {
        let mut stats = DedupStats {
            input: observations.len(),
            ..DedupStats::default()
        };
        let mut keep = vec![true; observations.len()];

        stats.exact_removed = exact_pass(&observations, &mut keep);
        debug!(removed = stats.exact_removed, "Exact pass finished");

        stats.fuzzy_removed = self.fuzzy_pass(&observations, &mut keep);
        debug!(removed = stats.fuzzy_removed, "Fuzzy pass finished");

        let survivors: Vec<Observation> = observations
            .into_iter()
            .zip(keep)
            .filter_map(|(obs, kept)| kept.then_some(obs))
            .collect();

        info!(
            input = stats.input,
            exact_removed = stats.exact_removed,
            fuzzy_removed = stats.fuzzy_removed,
            survivors = survivors.len(),
            "Deduplication complete"
        );
        (survivors, stats)
    }

    fn fuzzy_pass(&self, observations: &[Observation], keep: &mut [bool]) -> usize {
        let threshold = f64::from(self.threshold);
        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (idx, obs) in observations.iter().enumerate() {
            if keep[idx] {
                groups
                    .entry(obs.record.registration_number.as_str())
                    .or_default()
                    .push(idx);
            }
        }

        let mut removed = 0;
        for (registration_number, mut members) in groups {
            if members.len() < 2 {
                continue;
            }
            members.sort_by_key(|&idx| observations[idx].position);

            for (a, &i) in members.iter().enumerate() {
                if !keep[i] {
                    continue;
                }
                let name_i = &observations[i].record.company_name;
                for &j in &members[a + 1..] {
                    if !keep[j] {
                        continue;
                    }
                    let name_j = &observations[j].record.company_name;
                    let score = self.scorer.score(name_i, name_j);
                    if score >= threshold {
                        keep[j] = false;
                        removed += 1;
                        debug!(
                            registration_number,
                            kept = %name_i,
                            removed = %name_j,
                            score,
                            "Fuzzy duplicate removed"
                        );
                    }
                }
            }
        }
        removed
    }
}

/// Keep only the latest observation per cluster key; ties go to the later input position
fn exact_pass(observations: &[Observation], keep: &mut [bool]) -> usize {
    let mut latest: HashMap<&str, usize> = HashMap::new();
    let mut removed = 0;
    for (idx, obs) in observations.iter().enumerate() {
        match latest.entry(obs.cluster_key.as_str()) {
            Entry::Vacant(slot) => {
                slot.insert(idx);
            }
            Entry::Occupied(mut slot) => {
                let current = &observations[*slot.get()];
                if (obs.retrieved_at, obs.position) >= (current.retrieved_at, current.position) {
                    keep[*slot.get()] = false;
                    slot.insert(idx);
                } else {
                    keep[idx] = false;
                }
                removed += 1;
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::normalize::cluster_key;
    use crate::pipeline::processing::timestamp::parse_retrieved_at;
    use crate::types::RawRecord;

    fn observations(rows: &[(&str, &str, &str)]) -> Vec<Observation> {
        rows.iter()
            .enumerate()
            .map(|(position, (name, reg, at))| {
                let record = RawRecord::new(*name, *reg, *at);
                Observation {
                    cluster_key: cluster_key(&record),
                    retrieved_at: parse_retrieved_at(at).unwrap(),
                    record,
                    position,
                }
            })
            .collect()
    }

    fn default_dedup() -> Deduplicator {
        Deduplicator::default()
    }

    fn names(survivors: &[Observation]) -> Vec<(&str, &str)> {
        survivors
            .iter()
            .map(|o| (o.record.company_name.as_str(), o.record.retrieved_at.as_str()))
            .collect()
    }

    #[test]
    fn exact_repeats_keep_the_latest_observation() {
        let input = observations(&[
            ("Acme Inc", "1", "2023-01-01"),
            ("Acme Inc", "1", "2023-06-01"),
        ]);
        let (survivors, stats) = default_dedup().dedupe(input);

        assert_eq!(names(&survivors), vec![("Acme Inc", "2023-06-01")]);
        assert_eq!(stats.exact_removed, 1);
        assert_eq!(stats.fuzzy_removed, 0);
    }

    #[test]
    fn exact_pass_is_chronological_not_positional() {
        let input = observations(&[
            ("Acme Inc", "1", "2023-06-01"),
            ("ACME inc.", "1", "2022-01-01"),
            ("acme  INC", "1", "2023-03-01"),
        ]);
        let (survivors, _) = default_dedup().dedupe(input);
        assert_eq!(names(&survivors), vec![("Acme Inc", "2023-06-01")]);
    }

    #[test]
    fn equal_timestamps_keep_the_later_position() {
        let input = observations(&[
            ("Acme Inc", "1", "2023-01-01"),
            ("ACME INC", "1", "2023-01-01"),
        ]);
        let (survivors, _) = default_dedup().dedupe(input);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].position, 1);
    }

    #[test]
    fn similar_names_under_one_registration_number_collapse() {
        let input = observations(&[
            ("ACME Corp", "12345", "2023-01-01"),
            ("Acme Corporation", "12345", "2023-02-01"),
        ]);
        let (survivors, stats) = default_dedup().dedupe(input);

        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].record.company_name, "ACME Corp");
        assert_eq!(stats.fuzzy_removed, 1);
    }

    #[test]
    fn similar_names_under_different_registration_numbers_survive() {
        let input = observations(&[
            ("ACME Corp", "12345", "2023-01-01"),
            ("ACME Corp", "67890", "2023-01-01"),
        ]);
        let (survivors, _) = default_dedup().dedupe(input);
        assert_eq!(survivors.len(), 2);
    }

    #[test]
    fn dissimilar_names_under_one_registration_number_survive() {
        let input = observations(&[
            ("Acme Holding GmbH", "HRB 1", "2023-01-01"),
            ("Zenith Logistics GmbH", "HRB 1", "2023-01-01"),
        ]);
        let (survivors, stats) = default_dedup().dedupe(input);
        assert_eq!(survivors.len(), 2);
        assert_eq!(stats.survivors(), 2);
    }

    // Fixture for the greedy tie-break: A~B and B~C but not A~C.
    // A removes B first, so C has nothing left to match and survives.
    #[test]
    fn greedy_first_survivor_wins_chain() {
        let scorer = |a: &str, b: &str| {
            let pair = if a < b { (a, b) } else { (b, a) };
            match pair {
                ("alpha", "beta") | ("beta", "gamma") => 100.0,
                _ => 0.0,
            }
        };
        let input = observations(&[
            ("alpha", "7", "2023-01-01"),
            ("beta", "7", "2023-01-02"),
            ("gamma", "7", "2023-01-03"),
        ]);
        let (survivors, stats) = Deduplicator::with_scorer(92, scorer).unwrap().dedupe(input);

        let kept: Vec<&str> = survivors.iter().map(|o| o.record.company_name.as_str()).collect();
        assert_eq!(kept, vec!["alpha", "gamma"]);
        assert_eq!(stats.fuzzy_removed, 1);
    }

    #[test]
    fn earlier_position_wins_regardless_of_time() {
        let input = observations(&[
            ("Beispiel AG", "HRB 9", "2024-01-01"),
            ("Beispiel Aktiengesellschaft", "HRB 9", "2020-01-01"),
        ]);
        let (survivors, _) = default_dedup().dedupe(input);
        assert_eq!(names(&survivors), vec![("Beispiel AG", "2024-01-01")]);
    }

    #[test]
    fn exact_pass_runs_before_fuzzy_pass() {
        // The exact pass drops the 2023 "Acme Inc". The fuzzy pass then keeps
        // the earlier-positioned "Acme Incorporated" over the 2024 "Acme Inc".
        let input = observations(&[
            ("Acme Inc", "5", "2023-01-01"),
            ("Acme Incorporated", "5", "2023-06-01"),
            ("Acme Inc", "5", "2024-01-01"),
        ]);
        let (survivors, stats) = default_dedup().dedupe(input);

        assert_eq!(names(&survivors), vec![("Acme Incorporated", "2023-06-01")]);
        assert_eq!(stats.exact_removed, 1);
        assert_eq!(stats.fuzzy_removed, 1);
    }

    #[test]
    fn threshold_above_100_is_rejected() {
        assert!(matches!(Deduplicator::new(101), Err(PipelineError::Config(_))));
        assert_eq!(Deduplicator::new(100).unwrap().threshold(), 100);
    }

    #[test]
    fn zero_threshold_collapses_whole_group() {
        let input = observations(&[
            ("Alpha", "1", "2023-01-01"),
            ("Omega", "1", "2023-01-01"),
            ("Sigma", "1", "2023-01-01"),
        ]);
        let (survivors, _) = Deduplicator::new(0).unwrap().dedupe(input);
        assert_eq!(names(&survivors), vec![("Alpha", "2023-01-01")]);
    }
}
