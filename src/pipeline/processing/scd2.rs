use chrono::Duration;
use std::collections::BTreeMap;
use tracing::debug;

use crate::types::{ClusterKey, Observation, VersionedRecord};

/// Counts from one versioning run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VersionStats {
    pub clusters: usize,
    pub versions: usize,
    pub historical: usize,
}

/// Turn surviving observations into Type-2 history rows.
///
/// Each cluster is ordered by `retrieved_at` (input position breaks ties).
/// Every version but the last is closed one millisecond before its successor
/// opens; the last stays open and is the current one. Output is ordered by
/// cluster key, then `valid_from`.
pub fn build_versions(observations: Vec<Observation>) -> (Vec<VersionedRecord>, VersionStats) {
    let mut clusters: BTreeMap<ClusterKey, Vec<Observation>> = BTreeMap::new();
    for obs in observations {
        clusters.entry(obs.cluster_key.clone()).or_default().push(obs);
    }

    let mut stats = VersionStats {
        clusters: clusters.len(),
        ..VersionStats::default()
    };
    let mut versions = Vec::new();

    for (key, mut members) in clusters {
        members.sort_by_key(|obs| (obs.retrieved_at, obs.position));
        let next_starts: Vec<_> = members.iter().skip(1).map(|obs| obs.retrieved_at).collect();
        if members.len() > 1 {
            debug!(cluster_key = %key, versions = members.len(), "Cluster has history");
        }

        for (idx, obs) in members.into_iter().enumerate() {
            let valid_to = next_starts
                .get(idx)
                .map(|next| *next - Duration::milliseconds(1));
            if valid_to.is_some() {
                stats.historical += 1;
            }
            versions.push(VersionedRecord {
                record: obs.record,
                cluster_key: obs.cluster_key,
                valid_from: obs.retrieved_at,
                valid_to,
                is_current: valid_to.is_none(),
            });
        }
    }

    stats.versions = versions.len();
    (versions, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::normalize::cluster_key;
    use crate::pipeline::processing::timestamp::parse_retrieved_at;
    use crate::types::RawRecord;
    use chrono::{DateTime, Utc};

    fn obs(name: &str, reg: &str, at: &str, position: usize) -> Observation {
        let record = RawRecord::new(name, reg, at);
        Observation {
            cluster_key: cluster_key(&record),
            retrieved_at: parse_retrieved_at(at).unwrap(),
            record,
            position,
        }
    }

    fn ts(raw: &str) -> DateTime<Utc> {
        parse_retrieved_at(raw).unwrap()
    }

    #[test]
    fn three_observations_form_contiguous_history() {
        let input = vec![
            obs("Acme GmbH", "HRB 1", "2023-03-01T00:00:00Z", 0),
            obs("Acme GmbH", "HRB 1", "2023-01-01T00:00:00Z", 1),
            obs("Acme GmbH", "HRB 1", "2023-02-01T00:00:00Z", 2),
        ];
        let (versions, stats) = build_versions(input);

        let rows: Vec<_> = versions
            .iter()
            .map(|v| (v.valid_from, v.valid_to, v.is_current))
            .collect();
        assert_eq!(
            rows,
            vec![
                (ts("2023-01-01T00:00:00Z"), Some(ts("2023-01-31T23:59:59.999Z")), false),
                (ts("2023-02-01T00:00:00Z"), Some(ts("2023-02-28T23:59:59.999Z")), false),
                (ts("2023-03-01T00:00:00Z"), None, true),
            ]
        );
        assert_eq!(stats, VersionStats { clusters: 1, versions: 3, historical: 2 });
    }

    #[test]
    fn single_member_cluster_is_current() {
        let (versions, _) = build_versions(vec![obs("Solo AG", "HRB 2", "2023-05-05", 0)]);
        assert_eq!(versions.len(), 1);
        assert!(versions[0].is_current);
        assert_eq!(versions[0].valid_to, None);
        assert_eq!(versions[0].valid_from, ts("2023-05-05"));
    }

    #[test]
    fn each_cluster_has_exactly_one_current_row() {
        let input = vec![
            obs("Acme", "1", "2023-01-01", 0),
            obs("Zenith", "2", "2023-01-01", 1),
            obs("Acme", "1", "2023-04-01", 2),
            obs("Zenith", "2", "2022-01-01", 3),
            obs("Zenith", "2", "2024-01-01", 4),
        ];
        let (versions, stats) = build_versions(input);

        for key in ["acme_1", "zenith_2"] {
            let cluster: Vec<_> = versions.iter().filter(|v| v.cluster_key.as_str() == key).collect();
            assert_eq!(cluster.iter().filter(|v| v.is_current).count(), 1);
            assert!(cluster.last().unwrap().is_current);
            for pair in cluster.windows(2) {
                assert!(pair[0].valid_from < pair[1].valid_from);
                assert_eq!(pair[0].valid_to, Some(pair[1].valid_from - Duration::milliseconds(1)));
            }
        }
        assert_eq!(stats.clusters, 2);
        assert_eq!(stats.historical, 3);
    }

    #[test]
    fn boundary_instant_belongs_to_exactly_one_version() {
        let (versions, _) = build_versions(vec![
            obs("Acme", "1", "2023-01-01", 0),
            obs("Acme", "1", "2023-06-01", 1),
        ]);
        let boundary = ts("2023-06-01");
        let valid: Vec<_> = versions.iter().filter(|v| v.is_valid_at(boundary)).collect();
        assert_eq!(valid.len(), 1);
        assert!(valid[0].is_current);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let (versions, stats) = build_versions(Vec::new());
        assert!(versions.is_empty());
        assert_eq!(stats, VersionStats::default());
    }
}
