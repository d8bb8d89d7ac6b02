//! Discovery of installed templates.
//!
//! Templates live under `<root>/<author>/<id>/<version>/`. Listing walks the
//! whole tree for manifests, so hand-placed templates at other depths are
//! found as well.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{TemplateError, TemplateResult};
use crate::manifest::{read_manifest, TemplateManifest, MANIFEST_FILE};

/// Total order over version strings.
///
/// Semantic versions compare by semver precedence and rank above anything
/// that is not a semantic version; the remaining strings compare lexically.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (semver::Version::parse(a), semver::Version::parse(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Greater,
        (Err(_), Ok(_)) => Ordering::Less,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Parse every manifest under `catalog_root`, without de-duplication.
///
/// Manifests that fail to parse are skipped with a warning.
pub fn discover(catalog_root: &Path) -> TemplateResult<Vec<TemplateManifest>> {
    let pattern = format!(
        "{}/**/{}",
        glob::Pattern::escape(&catalog_root.to_string_lossy()),
        MANIFEST_FILE
    );
    debug!("Searching for manifests with {}", pattern);

    let paths = glob::glob(&pattern).map_err(|e| {
        TemplateError::NotFound(format!(
            "Invalid template path {}: {}",
            catalog_root.display(),
            e
        ))
    })?;

    let mut manifests = Vec::new();
    for entry in paths {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!("Skipping unreadable path {:?}: {}", e.path(), e.error());
                continue;
            }
        };
        match read_manifest(&path) {
            Ok(manifest) => manifests.push(manifest),
            Err(e) => warn!("Skipping {:?}: {}", path, e),
        }
    }
    Ok(manifests)
}

/// List installed templates, one entry per author and id.
///
/// The newest version of each template wins. A non-empty `name_filter` keeps
/// only templates whose id equals it. Results are sorted by author, then id.
pub fn list(catalog_root: &Path, name_filter: &str) -> TemplateResult<Vec<TemplateManifest>> {
    let mut newest: HashMap<(String, String), TemplateManifest> = HashMap::new();

    for manifest in discover(catalog_root)? {
        let key = (manifest.author().to_string(), manifest.id().to_string());
        match newest.get(&key) {
            Some(current) if compare_versions(manifest.version(), current.version()) != Ordering::Greater => {}
            _ => {
                newest.insert(key, manifest);
            }
        }
    }

    let mut templates: Vec<TemplateManifest> = newest
        .into_values()
        .filter(|m| name_filter.is_empty() || m.id() == name_filter)
        .collect();
    templates.sort_by(|a, b| {
        a.author()
            .cmp(b.author())
            .then_with(|| a.id().cmp(b.id()))
    });
    Ok(templates)
}

/// A parsed `[author/]id[@version]` template selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub author: Option<String>,
    pub id: String,
    pub version: Option<String>,
}

impl Selector {
    pub fn parse(input: &str) -> TemplateResult<Self> {
        let (name, version) = match input.split_once('@') {
            Some((name, version)) => (name, Some(version.to_string())),
            None => (input, None),
        };
        let (author, id) = match name.split_once('/') {
            Some((author, id)) => (Some(author.to_string()), id.to_string()),
            None => (None, name.to_string()),
        };

        let blank = id.is_empty()
            || id.contains('/')
            || author.as_deref() == Some("")
            || version.as_deref() == Some("");
        if blank {
            return Err(TemplateError::NotFound(format!(
                "Invalid template selector '{}', expected [author/]id[@version]",
                input
            )));
        }

        Ok(Self {
            author,
            id,
            version,
        })
    }

    fn matches(&self, manifest: &TemplateManifest) -> bool {
        manifest.id() == self.id
            && self.author.as_deref().map_or(true, |a| manifest.author() == a)
            && self.version.as_deref().map_or(true, |v| manifest.version() == v)
    }
}

/// Find the installed template named by `selector`.
///
/// Without a pinned version the newest version is returned. A bare id that
/// exists under several authors is an error.
pub fn find(catalog_root: &Path, selector: &str) -> TemplateResult<TemplateManifest> {
    let wanted = Selector::parse(selector)?;

    let mut candidates: Vec<TemplateManifest> = discover(catalog_root)?
        .into_iter()
        .filter(|m| wanted.matches(m))
        .collect();

    if candidates.is_empty() {
        return Err(TemplateError::NotFound(format!(
            "Could not find template '{}' in {}",
            selector,
            catalog_root.display()
        )));
    }

    let mut authors: Vec<String> = candidates.iter().map(TemplateManifest::selector).collect();
    authors.sort();
    authors.dedup();
    if authors.len() > 1 {
        return Err(TemplateError::Ambiguous {
            selector: selector.to_string(),
            candidates: authors,
        });
    }

    candidates.sort_by(|a, b| compare_versions(a.version(), b.version()));
    candidates.pop().ok_or_else(|| {
        TemplateError::NotFound(format!("Could not find template '{}'", selector))
    })
}
