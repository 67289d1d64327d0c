//! Build transforms
//!
//! A build transform turns raw source files and already resolved artifact
//! values into the value of one artifact. Transforms are looked up by
//! artifact name in a [`Builders`] table; [`Builders::default_set`] holds
//! the MetaNetX / RetroRules transforms for the packaged registry.

pub mod metanetx;
pub mod retrorules;
pub mod tsv;

use crate::error::{CacheError, CacheResult};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Inputs handed to a build transform
#[derive(Debug, Default, Clone)]
pub struct BuildInputs {
    sources: HashMap<String, Vec<u8>>,
    attrs: HashMap<String, Arc<Value>>,
}

impl BuildInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.add_source(file_name, bytes);
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: Arc<Value>) -> Self {
        self.add_attr(name, value);
        self
    }

    pub fn add_source(&mut self, file_name: impl Into<String>, bytes: Vec<u8>) {
        self.sources.insert(file_name.into(), bytes);
    }

    pub fn add_attr(&mut self, name: impl Into<String>, value: Arc<Value>) {
        self.attrs.insert(name.into(), value);
    }

    /// Raw bytes of a source file
    pub fn source(&self, file_name: &str) -> CacheResult<&[u8]> {
        self.sources
            .get(file_name)
            .map(Vec::as_slice)
            .ok_or_else(|| CacheError::SourceUnavailable(file_name.to_string()))
    }

    /// Source file as text, gunzipped when the name ends in `.gz`
    pub fn text(&self, file_name: &str) -> CacheResult<String> {
        tsv::text(file_name, self.source(file_name)?)
    }

    /// Resolved value of an attribute dependency
    pub fn attr(&self, name: &str) -> CacheResult<&Value> {
        self.attrs
            .get(name)
            .map(Arc::as_ref)
            .ok_or_else(|| CacheError::NotLoaded(name.to_string()))
    }

    /// Resolved attribute that must be a JSON object
    pub fn attr_object(&self, name: &str) -> CacheResult<&Map<String, Value>> {
        self.attr(name)?.as_object().ok_or_else(|| CacheError::Decode {
            file: name.to_string(),
            reason: "expected a JSON object".to_string(),
        })
    }

    /// Names of the provided source files
    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Names of the provided attributes
    pub fn attr_names(&self) -> impl Iterator<Item = &str> {
        self.attrs.keys().map(String::as_str)
    }
}

/// Produces an artifact value from its inputs
pub trait BuildTransform: Send + Sync {
    fn build(&self, inputs: &BuildInputs) -> CacheResult<Value>;
}

impl<F> BuildTransform for F
where
    F: Fn(&BuildInputs) -> CacheResult<Value> + Send + Sync,
{
    fn build(&self, inputs: &BuildInputs) -> CacheResult<Value> {
        self(inputs)
    }
}

/// Build transforms keyed by artifact name
#[derive(Clone, Default)]
pub struct Builders {
    transforms: HashMap<String, Arc<dyn BuildTransform>>,
}

impl Builders {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Transforms for the packaged MetaNetX / RetroRules registry
    pub fn default_set() -> Self {
        let mut builders = Self::new();
        builders.register("deprecatedCID_cid", metanetx::deprecated_cid_cid);
        builders.register("deprecatedRID_rid", metanetx::deprecated_rid_rid);
        builders.register("deprecatedCompID_compid", metanetx::deprecated_comp_id_compid);
        builders.register("cid_strc", metanetx::cid_strc);
        builders.register("cid_name", metanetx::cid_name);
        builders.register("cid_xref", metanetx::cid_xref);
        builders.register("chebi_cid", metanetx::chebi_cid);
        builders.register("inchikey_cid", metanetx::inchikey_cid);
        builders.register("comp_xref", metanetx::comp_xref);
        builders.register("rr_reactions", retrorules::rr_reactions);
        builders.register("template_reactions", retrorules::template_reactions);
        builders
    }

    /// Merge extra compound id conversions into `deprecatedCID_cid`
    pub fn with_cid_conversions(mut self, conversions: IndexMap<String, String>) -> Self {
        if !conversions.is_empty() {
            self.register(
                "deprecatedCID_cid",
                metanetx::deprecated_cid_cid_with(conversions),
            );
        }
        self
    }

    /// Add or replace the transform for `name`
    pub fn register(&mut self, name: impl Into<String>, transform: impl BuildTransform + 'static) {
        self.transforms.insert(name.into(), Arc::new(transform));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn BuildTransform>> {
        self.transforms.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }
}

impl std::fmt::Debug for Builders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.transforms.keys().collect();
        names.sort();
        f.debug_struct("Builders").field("transforms", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use serde_json::json;

    #[test]
    fn default_set_covers_builtin_registry() {
        let registry = Registry::builtin().unwrap();
        let builders = Builders::default_set();
        for name in registry.all() {
            assert!(builders.contains(name), "no transform for {}", name);
        }
    }

    #[test]
    fn closures_are_transforms() {
        let mut builders = Builders::new();
        builders.register("answer", |_: &BuildInputs| -> CacheResult<Value> {
            Ok(json!({"x": 42}))
        });
        let value = builders.get("answer").unwrap().build(&BuildInputs::new()).unwrap();
        assert_eq!(value, json!({"x": 42}));
    }

    #[test]
    fn cid_conversions_replace_default_transform() {
        let mut conversions = IndexMap::new();
        conversions.insert("MNXM731".to_string(), "MNXM732".to_string());
        let builders = Builders::default_set().with_cid_conversions(conversions);

        let inputs = BuildInputs::new().with_source("chem_xref.tsv", Vec::new());
        let value = builders.get("deprecatedCID_cid").unwrap().build(&inputs).unwrap();
        assert_eq!(value["MNXM731"], json!("MNXM732"));
        assert_eq!(value["MNXM01"], json!("MNXM1"));
    }

    #[test]
    fn missing_inputs_are_reported() {
        let inputs = BuildInputs::new().with_attr("a", Arc::new(json!([1])));
        assert!(matches!(
            inputs.source("chem_xref.tsv"),
            Err(CacheError::SourceUnavailable(_))
        ));
        assert!(matches!(inputs.attr("b"), Err(CacheError::NotLoaded(_))));
        assert!(inputs.attr_object("a").is_err());
    }
}
