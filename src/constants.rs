/// Column names of the input feed that every record must carry
pub const COMPANY_NAME: &str = "company_name";
pub const REGISTRATION_NUMBER: &str = "registration_number";
pub const RETRIEVED_AT: &str = "retrieved_at";

/// Columns appended to every output row
pub const CLUSTER_KEY: &str = "cluster_key";
pub const VALID_FROM: &str = "valid_from";
pub const VALID_TO: &str = "valid_to";
pub const IS_CURRENT: &str = "is_current";

/// Separator between the normalized name and the registration number in a cluster key
pub const CLUSTER_KEY_SEPARATOR: char = '_';

/// Rows per ingestion batch when nothing else is configured
pub const DEFAULT_BATCH_SIZE: usize = 100_000;

/// Minimum name similarity (0-100) for two observations to count as the same entity
pub const DEFAULT_SIMILARITY_THRESHOLD: u8 = 92;
