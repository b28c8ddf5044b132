//! Source control lookups: permanent locators, hashes and sizes of files

mod git;
mod memory;
mod traits;

pub use git::GitResolver;
pub use memory::StaticResolver;
pub use traits::{
    percent_encode_path, CommitInfo, FileState, Locator, ResolverError, ResolverResult,
    SourceControlResolver,
};
