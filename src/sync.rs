use crate::fetch;
use crate::source::Source;
use crate::verify::{self, Check};
use std::fmt;
use std::path::Path;

/// Where one source ended up after a sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Local file already matched its checksum.
    Present,
    /// Local file was missing or corrupt and a fresh download verified.
    Downloaded,
    /// No local file and nothing (or nothing allowed) to fetch it from.
    Missing,
    /// Local file failed verification and was removed; no download attempted.
    Corrupt,
    /// Unusable: an unsafe name, an I/O error while checking the local
    /// file, or a download that still did not verify.
    Failed,
}

impl Status {
    pub fn is_verified(self) -> bool {
        matches!(self, Status::Present | Status::Downloaded)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Present => "present",
            Status::Downloaded => "downloaded",
            Status::Missing => "missing",
            Status::Corrupt => "corrupt",
            Status::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Options<'a> {
    pub extension: &'a str,
    /// Never touch the network.
    pub offline: bool,
}

impl Default for Options<'_> {
    fn default() -> Self {
        Self {
            extension: "agf",
            offline: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct Report {
    pub entries: Vec<(Source, Status)>,
}

impl Report {
    /// Verified sources in their original order.
    pub fn verified(&self) -> Vec<Source> {
        self.entries
            .iter()
            .filter(|(_, status)| status.is_verified())
            .map(|(src, _)| src.clone())
            .collect()
    }

    pub fn dropped(&self) -> impl Iterator<Item = &(Source, Status)> {
        self.entries.iter().filter(|(_, status)| !status.is_verified())
    }

    pub fn into_verified(self) -> Vec<Source> {
        self.entries
            .into_iter()
            .filter(|(_, status)| status.is_verified())
            .map(|(src, _)| src)
            .collect()
    }
}

/// Verify `src` under `dir`, fetching it once if it fails and has a URL.
pub fn sync_source(src: &Source, dir: &Path, opts: Options<'_>) -> Status {
    let Some(path) = src.path_in(dir, opts.extension) else {
        tracing::error!("skipping {:?}: not a plain file name", src.name);
        return Status::Failed;
    };

    let check = verify::check_source(&path, &src.sha256);
    verify::log_check(&path, &check);

    // Remember whether a corrupt file was removed so the status can say so.
    let first = match check {
        Ok(Check::Verified) => return Status::Present,
        Ok(Check::Missing) => Status::Missing,
        Ok(Check::Mismatch { .. }) => Status::Corrupt,
        Err(_) => Status::Failed,
    };

    let url = match src.url.as_deref() {
        Some(url) if !opts.offline => url,
        _ => return first,
    };

    fetch::download_source(&path, url, src.post_body.as_deref());

    if verify::verify_source(&path, &src.sha256) {
        Status::Downloaded
    } else {
        tracing::warn!("dropping {}: download did not verify", src.name);
        Status::Failed
    }
}

/// Run [`sync_source`] over every source, in order.
pub fn sync_sources(sources: &[Source], dir: &Path, opts: Options<'_>) -> Report {
    let entries = sources
        .iter()
        .map(|src| (src.clone(), sync_source(src, dir, opts)))
        .collect();
    Report { entries }
}

/// The subset of `sources` whose local files verify, fetching failures once.
pub fn verify_sources(sources: Vec<Source>, dir: &Path) -> Vec<Source> {
    sync_sources(&sources, dir, Options::default()).into_verified()
}

/// Status of `src` without deleting or downloading anything.
pub fn inspect(src: &Source, dir: &Path, extension: &str) -> Status {
    let Some(path) = src.path_in(dir, extension) else {
        tracing::error!("skipping {:?}: not a plain file name", src.name);
        return Status::Failed;
    };
    match verify::inspect_source(&path, &src.sha256) {
        Ok(Check::Verified) => Status::Present,
        Ok(Check::Missing) => Status::Missing,
        Ok(Check::Mismatch { .. }) => Status::Corrupt,
        Err(e) => {
            tracing::error!("{:#}", e);
            Status::Failed
        }
    }
}
