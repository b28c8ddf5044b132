//! Formal parameters: canonical keys, fuzzy matching and versioning

mod normalize;
mod versioner;

pub use normalize::{is_fuzzy_match, local_parameter_id, normalize_identifier, sanitize_key, MatchStrictness};
pub use versioner::{Access, ParameterVersion, ParameterVersioner, VersioningOrder};
