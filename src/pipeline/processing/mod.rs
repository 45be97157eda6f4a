// Pipeline processing: key normalization, duplicate elimination, and versioning

pub mod dedup;
pub mod normalize;
pub mod scd2;
pub mod similarity;
pub mod timestamp;

pub use dedup::{DedupStats, Deduplicator, NameScorer, TokenSortScorer};
pub use normalize::{cluster_key, normalize_name};
pub use scd2::{build_versions, VersionStats};
pub use timestamp::parse_retrieved_at;
