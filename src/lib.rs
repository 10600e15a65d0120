//! Verify locally cached glass catalog files against known SHA256 digests,
//! fetching missing or corrupt ones from their zip archives.

pub mod config;
pub mod fetch;
pub mod logging;
pub mod source;
pub mod sync;
pub mod verify;

pub use fetch::download_source;
pub use source::Source;
pub use sync::verify_sources;
pub use verify::verify_source;
