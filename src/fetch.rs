use anyhow::{bail, Context, Result};
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

fn user_agent() -> String {
    format!("glasscat/{}", env!("CARGO_PKG_VERSION"))
}

/// GET `url`, or POST `post_body` as a form when given, and return the raw body.
pub fn fetch_bytes(url: &str, post_body: Option<&str>) -> Result<Vec<u8>> {
    let resp = match post_body {
        Some(body) => ureq::post(url)
            .header("User-Agent", user_agent())
            .header("Content-Type", FORM_CONTENT_TYPE)
            .send(body),
        None => ureq::get(url).header("User-Agent", user_agent()).call(),
    }
    .with_context(|| format!("Failed to download {}", url))?;

    let mut data = Vec::new();
    let mut reader = resp.into_body().into_reader();
    reader
        .read_to_end(&mut data)
        .with_context(|| format!("Failed to read response from {}", url))?;

    tracing::debug!("{}: {} bytes received", url, data.len());
    Ok(data)
}

/// Bytes of the last entry in a zip archive.
///
/// Catalog archives carry one data file, possibly preceded by directories or
/// metadata, so the last listed entry is taken as the catalog.
pub fn unpack_last_entry(archive: Vec<u8>) -> Result<Vec<u8>> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).context("Not a zip archive")?;

    let Some(last) = zip.len().checked_sub(1) else {
        bail!("Zip archive is empty");
    };

    let mut entry = zip
        .by_index(last)
        .with_context(|| format!("Failed to open zip entry #{}", last))?;
    tracing::debug!("extracting {} ({} bytes)", entry.name(), entry.size());

    let mut data = Vec::new();
    entry
        .read_to_end(&mut data)
        .with_context(|| format!("Failed to extract {}", entry.name()))?;
    Ok(data)
}

/// Download, unpack and write to `dest`. Returns the number of bytes written.
pub fn try_download(dest: &Path, url: &str, post_body: Option<&str>) -> Result<u64> {
    let archive = fetch_bytes(url, post_body)?;
    let data = unpack_last_entry(archive)?;

    if let Some(dir) = dest.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    fs::write(dest, &data).with_context(|| format!("Failed to write {}", dest.display()))?;

    Ok(data.len() as u64)
}

/// Fetch `url` into `dest`. Failures are logged; the caller re-verifies.
pub fn download_source(dest: &Path, url: &str, post_body: Option<&str>) {
    tracing::info!("downloading {} from {}", dest.display(), url);
    match try_download(dest, url, post_body) {
        Ok(bytes) => tracing::info!("wrote {} bytes to {}", bytes, dest.display()),
        Err(e) => tracing::error!("download of {} failed: {:#}", url, e),
    }
}
