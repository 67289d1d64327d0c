//! Artifact registry
//!
//! The registry is the read-only table of every artifact the cache knows
//! about. It is built once from a descriptor (the packaged one, compiled
//! into the binary, or a file named in the configuration) and then shared
//! by `Arc` between the resolver and the acquirer.

pub mod descriptor;

pub use descriptor::{DepsSection, Descriptor, DescriptorEntry, FileSection};

use crate::error::{CacheError, CacheResult};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

// Packaged descriptor embedded at compile time
const BUILTIN_DESCRIPTOR: &str = include_str!("../../data/cache.json");

/// Where a pre-built copy of an artifact lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLocation {
    /// Base URL, ending with the directory separator
    pub url: String,

    /// File name, also used for the local copy
    pub file_name: String,
}

impl RemoteLocation {
    /// Full download URL (`url` + `file_name`)
    pub fn full_url(&self) -> String {
        format!("{}{}", self.url, self.file_name)
    }
}

/// Immutable declaration of one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    /// Unique registry key
    pub name: String,

    /// Pre-built copy location
    pub remote: RemoteLocation,

    /// Expected fingerprint of the artifact file
    pub fingerprint: String,

    /// Raw source files needed to rebuild
    pub file_deps: Vec<String>,

    /// Artifacts read by the rebuild
    pub attr_deps: Vec<String>,

    /// Historical names resolving to this artifact
    pub aliases: Vec<String>,
}

/// The loaded registry
#[derive(Debug, Clone)]
pub struct Registry {
    specs: Vec<ArtifactSpec>,
    index: HashMap<String, usize>,
    aliases: HashMap<String, usize>,
}

impl Registry {
    /// Load the packaged descriptor
    pub fn builtin() -> CacheResult<Self> {
        Self::from_descriptor(Descriptor::parse(BUILTIN_DESCRIPTOR)?)
    }

    /// Load a descriptor file
    pub async fn from_file(path: &Path) -> CacheResult<Self> {
        Self::from_descriptor(Descriptor::from_file(path).await?)
    }

    /// Load from `path` if given, the packaged descriptor otherwise
    pub async fn load(path: Option<&Path>) -> CacheResult<Self> {
        match path {
            Some(path) => {
                debug!("Loading registry from {}", path.display());
                Self::from_file(path).await
            }
            None => Self::builtin(),
        }
    }

    /// Validate a parsed descriptor and build the lookup tables
    pub fn from_descriptor(descriptor: Descriptor) -> CacheResult<Self> {
        let mut specs = Vec::with_capacity(descriptor.entries.len());
        let mut index = HashMap::new();
        let mut files: HashMap<&str, &str> = HashMap::new();

        for (name, entry) in &descriptor.entries {
            validate_name(name, name)?;
            let deps = entry.require_deps(name)?;
            let (url, file_name, fingerprint) = entry.require_file(name)?;
            validate_name(name, file_name)?;
            if let Some(owner) = files.insert(file_name, name) {
                return Err(CacheError::RegistryInvalid {
                    entry: name.clone(),
                    reason: format!("file.name '{}' is already used by {}", file_name, owner),
                });
            }

            index.insert(name.clone(), specs.len());
            specs.push(ArtifactSpec {
                name: name.clone(),
                remote: RemoteLocation {
                    url: url.to_string(),
                    file_name: file_name.to_string(),
                },
                fingerprint: fingerprint.trim().to_string(),
                file_deps: dedup(&deps.file_deps),
                attr_deps: dedup(&deps.attr_deps),
                aliases: entry.aliases.clone(),
            });
        }

        let mut aliases = HashMap::new();
        for (i, spec) in specs.iter().enumerate() {
            for alias in &spec.aliases {
                if index.contains_key(alias) || aliases.insert(alias.clone(), i).is_some() {
                    return Err(CacheError::RegistryInvalid {
                        entry: spec.name.clone(),
                        reason: format!("alias '{}' is already taken", alias),
                    });
                }
            }
        }

        debug!("Registry loaded with {} artifacts", specs.len());
        Ok(Self {
            specs,
            index,
            aliases,
        })
    }

    /// Look up an artifact by name or alias
    pub fn lookup(&self, name: &str) -> CacheResult<&ArtifactSpec> {
        self.index_of(name)
            .map(|i| &self.specs[i])
            .ok_or_else(|| CacheError::UnknownArtifact(name.to_string()))
    }

    /// Arena index of an artifact, resolving aliases
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index
            .get(name)
            .or_else(|| self.aliases.get(name))
            .copied()
    }

    /// Spec at an arena index
    pub fn at(&self, index: usize) -> &ArtifactSpec {
        &self.specs[index]
    }

    /// Whether a name or alias is known
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// All artifact names in descriptor order
    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.name.as_str())
    }

    /// All specs in descriptor order
    pub fn specs(&self) -> &[ArtifactSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Render back into a descriptor, replacing fingerprints where given
    pub fn to_descriptor(&self, fingerprints: &HashMap<String, String>) -> Descriptor {
        let entries = self
            .specs
            .iter()
            .map(|spec| {
                let fingerprint = fingerprints
                    .get(&spec.name)
                    .unwrap_or(&spec.fingerprint)
                    .clone();
                let entry = DescriptorEntry {
                    deps: Some(DepsSection {
                        attr_deps: spec.attr_deps.clone(),
                        file_deps: spec.file_deps.clone(),
                    }),
                    file: Some(FileSection {
                        url: Some(spec.remote.url.clone()),
                        name: Some(spec.remote.file_name.clone()),
                        fingerprint: Some(fingerprint),
                    }),
                    aliases: spec.aliases.clone(),
                };
                (spec.name.clone(), entry)
            })
            .collect();
        Descriptor { entries }
    }
}

/// Reject empty names and names that could escape the cache directory
fn validate_name(entry: &str, name: &str) -> CacheResult<()> {
    if name.is_empty() {
        return Err(CacheError::RegistryInvalid {
            entry: entry.to_string(),
            reason: "name cannot be empty".to_string(),
        });
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") || name.contains('\0') {
        return Err(CacheError::RegistryInvalid {
            entry: entry.to_string(),
            reason: format!("'{}' must not contain path separators or '..'", name),
        });
    }
    Ok(())
}

fn dedup(names: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !out.contains(name) {
            out.push(name.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry(json: &str) -> CacheResult<Registry> {
        Registry::from_descriptor(Descriptor::parse(json)?)
    }

    #[test]
    fn builtin_registry_loads() {
        let registry = Registry::builtin().unwrap();
        assert!(registry.contains("cid_strc"));
        assert!(registry.contains("template_reactions"));
        assert_eq!(registry.lookup("chebi_cid").unwrap().attr_deps, vec!["cid_xref"]);
    }

    #[test]
    fn builtin_alias_resolves_renamed_artifact() {
        let registry = Registry::builtin().unwrap();
        let spec = registry.lookup("rr_full_reactions").unwrap();
        assert_eq!(spec.name, "template_reactions");
    }

    #[test]
    fn lookup_unknown_errors() {
        let registry = Registry::builtin().unwrap();
        assert!(matches!(
            registry.lookup("nope"),
            Err(CacheError::UnknownArtifact(name)) if name == "nope"
        ));
    }

    #[test]
    fn all_keeps_descriptor_order() {
        let registry = registry(
            r#"{
            "z": {"deps": {}, "file": {"url": "u/", "name": "z.json", "fingerprint": "1"}},
            "a": {"deps": {}, "file": {"url": "u/", "name": "a.json", "fingerprint": "2"}}
        }"#,
        )
        .unwrap();
        assert_eq!(registry.all().collect::<Vec<_>>(), vec!["z", "a"]);
        assert_eq!(registry.lookup("a").unwrap().remote.full_url(), "u/a.json");
    }

    #[test]
    fn missing_required_field_fails() {
        let result = registry(r#"{"a": {"deps": {}, "file": {"url": "u/", "name": "a.json"}}}"#);
        assert!(matches!(result, Err(CacheError::RegistryInvalid { entry, .. }) if entry == "a"));
    }

    #[test]
    fn deps_are_deduplicated() {
        let registry = registry(
            r#"{"a": {"deps": {"file_deps": ["x.tsv", "x.tsv"], "attr_deps": ["b", "b"]},
                      "file": {"url": "u/", "name": "a.json", "fingerprint": "1"}}}"#,
        )
        .unwrap();
        let spec = registry.lookup("a").unwrap();
        assert_eq!(spec.file_deps, vec!["x.tsv"]);
        assert_eq!(spec.attr_deps, vec!["b"]);
    }

    #[test]
    fn rejects_traversal_file_name() {
        let result = registry(
            r#"{"a": {"deps": {}, "file": {"url": "u/", "name": "../a.json", "fingerprint": "1"}}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_alias_clash() {
        let result = registry(
            r#"{
            "a": {"deps": {}, "file": {"url": "u/", "name": "a.json", "fingerprint": "1"}},
            "b": {"deps": {}, "file": {"url": "u/", "name": "b.json", "fingerprint": "1"}, "aliases": ["a"]}
        }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_shared_file_name() {
        let err = registry(
            r#"{"a": {"deps": {}, "file": {"url": "u/", "name": "same.json", "fingerprint": ""}},
                "b": {"deps": {}, "file": {"url": "u/", "name": "same.json", "fingerprint": ""}}}"#,
        )
        .unwrap_err();
        assert!(
            matches!(&err, CacheError::RegistryInvalid { entry, reason } if entry == "b" && reason.contains("a"))
        );
    }

    #[test]
    fn to_descriptor_overrides_fingerprints() {
        let registry = Registry::builtin().unwrap();
        let mut fingerprints = HashMap::new();
        fingerprints.insert("cid_name".to_string(), "beef".to_string());

        let descriptor = registry.to_descriptor(&fingerprints);
        let reloaded = Registry::from_descriptor(descriptor).unwrap();
        assert_eq!(reloaded.lookup("cid_name").unwrap().fingerprint, "beef");
        assert_eq!(
            reloaded.all().collect::<Vec<_>>(),
            registry.all().collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cache.json");
        std::fs::write(
            &path,
            r#"{"a": {"deps": {}, "file": {"url": "u/", "name": "a.json", "fingerprint": "1"}}}"#,
        )
        .unwrap();

        let registry = Registry::load(Some(&path)).await.unwrap();
        assert_eq!(registry.len(), 1);
    }
}
