use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// One fetchable catalog file: `[name, sha256, url?, post_body?]` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Source {
    pub name: String,
    pub sha256: String,
    pub url: Option<String>,
    pub post_body: Option<String>,
}

impl Source {
    pub fn new(name: impl Into<String>, sha256: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sha256: sha256.into(),
            url: None,
            post_body: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_post_body(mut self, body: impl Into<String>) -> Self {
        self.post_body = Some(body.into());
        self
    }

    /// Local path of this source under `dir`, e.g. `dir/schott.agf`.
    ///
    /// `None` when `<name>.<extension>` would not stay a plain file name
    /// inside `dir` (separators, `..`, absolute paths).
    pub fn path_in(&self, dir: &Path, extension: &str) -> Option<PathBuf> {
        let file_name = format!("{}.{}", self.name, extension);
        if is_plain_name(&self.name) && is_plain_name(&file_name) {
            Some(dir.join(file_name))
        } else {
            None
        }
    }
}

/// A single normal path component with no separators of either platform.
fn is_plain_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

impl TryFrom<Vec<String>> for Source {
    type Error = String;

    fn try_from(fields: Vec<String>) -> Result<Self, Self::Error> {
        if !(2..=4).contains(&fields.len()) {
            return Err(format!(
                "source descriptor needs 2 to 4 fields, got {}",
                fields.len()
            ));
        }

        let mut fields = fields.into_iter();
        let name = fields.next().unwrap_or_default();
        let sha256 = fields.next().unwrap_or_default();
        let url = fields.next().filter(|s| !s.is_empty());
        let post_body = fields.next().filter(|s| !s.is_empty());

        if name.is_empty() {
            return Err("source descriptor has an empty name".to_string());
        }
        if !is_plain_name(&name) {
            return Err(format!("source name {:?} is not a plain file name", name));
        }

        Ok(Self {
            name,
            sha256,
            url,
            post_body,
        })
    }
}

impl From<Source> for Vec<String> {
    fn from(src: Source) -> Self {
        let mut fields = vec![src.name, src.sha256];
        match (src.url, src.post_body) {
            (Some(url), Some(body)) => fields.extend([url, body]),
            (Some(url), None) => fields.push(url),
            (None, Some(body)) => fields.extend([String::new(), body]),
            (None, None) => {}
        }
        fields
    }
}

/// Load the ordered source list from a JSON manifest.
pub fn load_manifest(path: &Path) -> Result<Vec<Source>> {
    if !path.exists() {
        bail!(
            "Manifest not found at {} (pass --manifest or set it in the config)",
            path.display()
        );
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    let sources: Vec<Source> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid manifest {}", path.display()))?;

    tracing::debug!("{} sources in {}", sources.len(), path.display());
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_to_four_fields() {
        let json = r#"[
            ["glassC", "abc"],
            ["glassA", "def", "http://example/glassA.zip"],
            ["glassP", "123", "http://example/form", "cat=p&fmt=agf"]
        ]"#;
        let sources: Vec<Source> = serde_json::from_str(json).unwrap();

        assert_eq!(sources[0], Source::new("glassC", "abc"));
        assert_eq!(
            sources[1],
            Source::new("glassA", "def").with_url("http://example/glassA.zip")
        );
        assert_eq!(sources[2].post_body.as_deref(), Some("cat=p&fmt=agf"));
    }

    #[test]
    fn rejects_bad_arity_and_empty_name() {
        assert!(serde_json::from_str::<Source>(r#"["only"]"#).is_err());
        assert!(serde_json::from_str::<Source>(r#"["a","b","c","d","e"]"#).is_err());
        assert!(serde_json::from_str::<Source>(r#"["", "abc"]"#).is_err());
    }

    #[test]
    fn empty_url_is_absent() {
        let src: Source = serde_json::from_str(r#"["x", "abc", ""]"#).unwrap();
        assert_eq!(src.url, None);
    }

    #[test]
    fn serializes_back_to_array_form() {
        let src = Source::new("glassP", "123").with_url("http://example/form");
        let json = serde_json::to_string(&src).unwrap();
        assert_eq!(json, r#"["glassP","123","http://example/form"]"#);
    }

    #[test]
    fn path_uses_name_and_extension() {
        let src = Source::new("schott", "abc");
        assert_eq!(
            src.path_in(Path::new("/data"), "agf"),
            Some(PathBuf::from("/data/schott.agf"))
        );
    }

    #[test]
    fn rejects_names_leaving_the_directory() {
        for json in [
            r#"["../victim", "00"]"#,
            r#"["/etc/passwd", "00"]"#,
            r#"["sub/schott", "00"]"#,
            r#"["sub\\schott", "00"]"#,
            r#"["..", "00"]"#,
            r#"[".", "00"]"#,
        ] {
            assert!(serde_json::from_str::<Source>(json).is_err(), "{}", json);
        }
    }

    #[test]
    fn path_in_refuses_unsafe_names_and_extensions() {
        let dir = Path::new("/data");
        assert_eq!(Source::new("../victim", "00").path_in(dir, "agf"), None);
        assert_eq!(Source::new("/abs", "00").path_in(dir, "agf"), None);
        assert_eq!(Source::new("schott", "00").path_in(dir, "agf/../x"), None);
    }

    #[test]
    fn load_manifest_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_manifest(&dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("Manifest not found"));
    }

    #[test]
    fn load_manifest_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.json");
        fs::write(&path, r#"[["ohara", "abc", "http://example/ohara.zip"]]"#).unwrap();

        let sources = load_manifest(&path).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "ohara");
    }
}
