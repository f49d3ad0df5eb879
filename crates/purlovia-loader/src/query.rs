//! Asset name enumeration

use regex::Regex;
use tracing::warn;
use walkdir::WalkDir;

use crate::config::DEFAULT_EXTENSIONS;
use crate::error::LoadResult;
use crate::paths::PathCanonicalizer;

/// Description of a set of assets to enumerate
///
/// Patterns are regular expressions matched against the start of canonical
/// names. A query can be run any number of times; each run walks the
/// directory tree afresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetQuery {
    pattern: String,
    root: String,
    excludes: Vec<String>,
    extensions: Vec<String>,
}

impl AssetQuery {
    /// Names matching `pattern` anywhere under `/`
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            root: "/".to_string(),
            excludes: Vec::new(),
            extensions: vec![DEFAULT_EXTENSIONS[0].to_string()],
        }
    }

    /// Only walk below this asset name
    #[must_use]
    pub fn under(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Drop names matching `pattern`
    #[must_use]
    pub fn excluding(mut self, pattern: impl Into<String>) -> Self {
        self.excludes.push(pattern.into());
        self
    }

    /// Accept files with these extensions, compared case-insensitively
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Enumeration root
    pub fn root(&self) -> &str {
        &self.root
    }

    pub(crate) fn run<'a>(&self, paths: PathCanonicalizer<'a>) -> LoadResult<AssetNames<'a>> {
        let root = paths.to_path(&self.root, None)?;
        Ok(AssetNames {
            walker: WalkDir::new(root).follow_links(true).into_iter(),
            paths,
            pattern: anchored(&self.pattern)?,
            excludes: self
                .excludes
                .iter()
                .map(String::as_str)
                .map(anchored)
                .collect::<LoadResult<_>>()?,
            extensions: self
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        })
    }
}

fn anchored(pattern: &str) -> LoadResult<Regex> {
    Ok(Regex::new(&format!("^(?:{pattern})"))?)
}

/// Lazy sequence of canonical asset names, in directory walk order
pub struct AssetNames<'a> {
    walker: walkdir::IntoIter,
    paths: PathCanonicalizer<'a>,
    pattern: Regex,
    excludes: Vec<Regex>,
    extensions: Vec<String>,
}

impl std::fmt::Debug for AssetNames<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetNames")
            .field("pattern", &self.pattern.as_str())
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl AssetNames<'_> {
    fn accepts_extension(&self, path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
    }
}

impl Iterator for AssetNames<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.accepts_extension(entry.path()) {
                continue;
            }

            let Some(name) = self.paths.name_from_path(entry.path()) else {
                continue;
            };
            if !self.pattern.is_match(&name) || self.excludes.iter().any(|x| x.is_match(&name)) {
                continue;
            }
            return Some(name);
        }
    }
}
