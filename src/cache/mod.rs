//! On-disk cache of channel repodata
//!
//! Each channel subdirectory has two artifacts under `<pkgs_dir>/cache`:
//!
//! | Artifact | File | Trusted when |
//! |----------|------|--------------|
//! | JSON cache | `<hash>.json` | Fresh per TTL, or revalidated with 304 |
//! | Derived cache | `<hash>.solv` | JSON cache trusted and `.solv` not older |
//!
//! The JSON cache embeds its own revalidation headers (`_url`, `_etag`,
//! `_mod`, `_cache_control`) as its first keys.

pub mod decompress;
pub mod dir;
pub mod freshness;
pub mod header;
pub mod staging;
pub mod subdir;

pub use decompress::decompress;
pub use dir::{cache_fn_url, cache_name_from_url, create_cache_dir, first_writable_pkgs_dir};
pub use header::{read_header, HeaderMetadata};
pub use staging::StagingFile;
pub use subdir::{plan_finalize, FinalizePlan, LoadOutcome, RepoMetadata, SubdirCache};
