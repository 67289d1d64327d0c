//! MetaNetX transforms: identifier maps, cross references and structures

use super::tsv::{self, Header, Table};
use super::{BuildInputs, BuildTransform};
use crate::error::{CacheError, CacheResult};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

const CHEM_XREF: &str = "chem_xref.tsv";
const REAC_XREF: &str = "reac_xref.tsv";
const COMP_XREF: &str = "comp_xref.tsv";
const CHEM_PROP: &str = "chem_prop.tsv";
const RR_COMPOUNDS: &str = "compounds.tsv.gz";
const REPLACEMENTS: &str = "MNXM_replacement_20190524.csv";

/// Placeholder key for compounds without an InChIKey
pub const NO_INCHIKEY: &str = "NO_INCHIKEY";

/// Structure record of one compound
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Compound {
    pub formula: Option<String>,
    pub smiles: Option<String>,
    pub inchi: Option<String>,
    pub inchikey: Option<String>,
    pub cid: String,
    pub name: Option<String>,
}

/// `deprecated:OLD -> NEW` lines of a MetaNetX xref file
fn deprecated_ids(text: &str) -> IndexMap<String, String> {
    let mut ids = IndexMap::new();
    for row in tsv::records(text, '\t') {
        let (Some(source), Some(target)) = (row.first(), row.get(1)) else {
            continue;
        };
        if let Some(old) = source.strip_prefix("deprecated:") {
            ids.insert(old.to_string(), target.to_string());
        }
    }
    ids
}

/// Split a `db:id` cross reference into database name and identifier
fn split_xref(reference: &str) -> (String, String) {
    match reference.split_once(':') {
        None => ("mnx".to_string(), reference.to_string()),
        Some((db, rest)) => {
            let db = if db == "deprecated" { "mnx" } else { db };
            (db.to_string(), rest.replace(':', ""))
        }
    }
}

/// Current identifier for a possibly deprecated one
fn current<'a>(deprecated: &'a Map<String, Value>, id: &'a str) -> &'a str {
    deprecated.get(id).and_then(Value::as_str).unwrap_or(id)
}

/// Deprecated chemical id to current chemical id
pub fn deprecated_cid_cid(inputs: &BuildInputs) -> CacheResult<Value> {
    deprecated_cids(inputs, &IndexMap::new())
}

/// [`deprecated_cid_cid`] with extra `old -> new` compound conversions
/// applied last, so they win over the MetaNetX mapping
pub fn deprecated_cid_cid_with(conversions: IndexMap<String, String>) -> impl BuildTransform {
    move |inputs: &BuildInputs| deprecated_cids(inputs, &conversions)
}

/// Parse a JSON object of compound id conversions
pub fn parse_conversions(file: &str, content: &str) -> CacheResult<IndexMap<String, String>> {
    serde_json::from_str(content).map_err(|e| CacheError::Decode {
        file: file.to_string(),
        reason: e.to_string(),
    })
}

fn deprecated_cids(
    inputs: &BuildInputs,
    conversions: &IndexMap<String, String>,
) -> CacheResult<Value> {
    let mut ids = deprecated_ids(&inputs.text(CHEM_XREF)?);
    ids.insert("MNXM01".to_string(), "MNXM1".to_string());
    ids.extend(conversions.iter().map(|(old, new)| (old.clone(), new.clone())));
    debug!(
        "{} deprecated compound ids ({} extra conversions)",
        ids.len(),
        conversions.len()
    );
    Ok(serde_json::to_value(ids)?)
}

/// Deprecated reaction id to current reaction id
pub fn deprecated_rid_rid(inputs: &BuildInputs) -> CacheResult<Value> {
    let ids = deprecated_ids(&inputs.text(REAC_XREF)?);
    debug!("{} deprecated reaction ids", ids.len());
    Ok(serde_json::to_value(ids)?)
}

/// Compound cross references in both directions.
///
/// `cid -> db -> [ids]` for every MetaNetX compound, plus `db -> id -> cid`
/// for every external database.
pub fn cid_xref(inputs: &BuildInputs) -> CacheResult<Value> {
    let text = inputs.text(CHEM_XREF)?;
    let deprecated = inputs.attr_object("deprecatedCID_cid")?;

    let mut forward: IndexMap<String, IndexMap<String, Vec<String>>> = IndexMap::new();
    let mut reverse: IndexMap<String, IndexMap<String, String>> = IndexMap::new();

    for row in tsv::records(&text, '\t') {
        let (Some(reference), Some(cid)) = (row.first(), row.get(1)) else {
            continue;
        };
        let cid = current(deprecated, cid).to_string();
        let (db, id) = split_xref(reference);

        let ids = forward.entry(cid.clone()).or_default().entry(db.clone()).or_default();
        if !ids.contains(&id) {
            ids.push(id.clone());
        }
        reverse.entry(db).or_default().entry(id).or_insert(cid);
    }

    let mut xref = match serde_json::to_value(forward)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (db, ids) in reverse {
        let slot = xref.entry(db).or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(slot) = slot {
            for (id, cid) in ids {
                slot.entry(id).or_insert(Value::String(cid));
            }
        }
    }
    Ok(Value::Object(xref))
}

/// ChEBI id to MetaNetX compound id
pub fn chebi_cid(inputs: &BuildInputs) -> CacheResult<Value> {
    let xref = inputs.attr_object("cid_xref")?;
    let mut chebi = Map::new();
    for (cid, dbs) in xref {
        let Some(ids) = dbs.get("chebi").and_then(Value::as_array) else {
            continue;
        };
        for id in ids.iter().filter_map(Value::as_str) {
            chebi.insert(id.to_string(), Value::String(cid.clone()));
        }
    }
    Ok(Value::Object(chebi))
}

/// InChIKey to the compounds sharing it
pub fn inchikey_cid(inputs: &BuildInputs) -> CacheResult<Value> {
    let structures = inputs.attr_object("cid_strc")?;
    let mut keys: IndexMap<String, Vec<String>> = IndexMap::new();
    for (cid, strc) in structures {
        let key = strc
            .get("inchikey")
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
            .unwrap_or(NO_INCHIKEY);
        keys.entry(key.to_string()).or_default().push(cid.clone());
    }
    Ok(serde_json::to_value(keys)?)
}

/// Compartment cross references and the reverse id map
fn compartments(
    inputs: &BuildInputs,
) -> CacheResult<(IndexMap<String, IndexMap<String, Vec<String>>>, IndexMap<String, String>)> {
    let text = inputs.text(COMP_XREF)?;
    let mut xref: IndexMap<String, IndexMap<String, Vec<String>>> = IndexMap::new();
    let mut reverse = IndexMap::new();

    for row in tsv::records(&text, '\t') {
        let (Some(reference), Some(compid)) = (row.first(), row.get(1)) else {
            continue;
        };
        let (db, id) = match split_xref(reference) {
            (db, id) if reference.contains(':') => (db, id.to_lowercase()),
            plain => plain,
        };

        let ids = xref
            .entry(compid.to_string())
            .or_default()
            .entry(db)
            .or_default();
        if !ids.contains(&id) {
            ids.push(id.clone());
        }
        reverse.entry(id).or_insert_with(|| compid.to_string());
    }
    Ok((xref, reverse))
}

/// Compartment id to `db -> [ids]`
pub fn comp_xref(inputs: &BuildInputs) -> CacheResult<Value> {
    let (xref, _) = compartments(inputs)?;
    Ok(serde_json::to_value(xref)?)
}

/// Any known compartment id to MetaNetX compartment id
pub fn deprecated_comp_id_compid(inputs: &BuildInputs) -> CacheResult<Value> {
    let (_, reverse) = compartments(inputs)?;
    Ok(serde_json::to_value(reverse)?)
}

/// Structures and names from RetroRules compounds and MetaNetX properties
fn structures(
    inputs: &BuildInputs,
) -> CacheResult<(IndexMap<String, Compound>, IndexMap<String, String>)> {
    let deprecated = inputs.attr_object("deprecatedCID_cid")?;
    let mut strc: IndexMap<String, Compound> = IndexMap::new();
    let mut names: IndexMap<String, String> = IndexMap::new();

    let compounds = inputs.text(RR_COMPOUNDS)?;
    let table = Table::parse(&compounds, Header::FirstLine);
    table.require(RR_COMPOUNDS, &["cid", "inchi"])?;
    for row in table.rows() {
        let Some(cid) = row.value("cid") else {
            continue;
        };
        let cid = current(deprecated, cid).to_string();
        strc.insert(
            cid.clone(),
            Compound {
                inchi: row.value("inchi").map(str::to_string),
                cid,
                ..Compound::default()
            },
        );
    }

    let properties = inputs.text(CHEM_PROP)?;
    let table = Table::parse(&properties, Header::LastComment);
    table.require(CHEM_PROP, &["ID", "name", "formula", "InChI", "InChIKey", "SMILES"])?;
    let mut skipped = 0usize;
    for row in table.rows() {
        let Some(id) = row.value("ID") else {
            continue;
        };
        let cid = current(deprecated, id).to_string();
        let owned = |column: &str| row.value(column).map(str::to_string);

        if let Some(name) = row.value("name") {
            names.entry(cid.clone()).or_insert_with(|| name.to_string());
        }

        match strc.get_mut(&cid) {
            Some(known) => {
                known.formula = owned("formula");
                known.name = owned("name");
                if known.smiles.is_none() {
                    known.smiles = owned("SMILES");
                }
                if known.inchikey.is_none() {
                    known.inchikey = owned("InChIKey");
                }
            }
            None => {
                if row.value("InChI").is_none() && row.value("SMILES").is_none() {
                    skipped += 1;
                    continue;
                }
                strc.insert(
                    cid.clone(),
                    Compound {
                        formula: owned("formula"),
                        smiles: owned("SMILES"),
                        inchi: owned("InChI"),
                        inchikey: owned("InChIKey"),
                        cid,
                        name: owned("name"),
                    },
                );
            }
        }
    }
    if skipped > 0 {
        warn!("{} compounds in {} have no InChI or SMILES", skipped, CHEM_PROP);
    }

    // Compounds without a structure borrow the one of a manually chosen twin
    let replacements = inputs.text(REPLACEMENTS)?;
    for row in tsv::records(&replacements, ' ') {
        let (Some(target), Some(source)) = (row.first(), row.get(1)) else {
            continue;
        };
        if *source == "R_group" {
            continue;
        }
        match strc.get(*source).cloned() {
            Some(compound) => {
                strc.insert(target.to_string(), compound);
            }
            None => warn!("Replacement {} -> {}: no structure for {}", target, source, source),
        }
    }

    Ok((strc, names))
}

/// Compound id to structure record
pub fn cid_strc(inputs: &BuildInputs) -> CacheResult<Value> {
    let (strc, _) = structures(inputs)?;
    Ok(serde_json::to_value(strc)?)
}

/// Compound id to its first listed name
pub fn cid_name(inputs: &BuildInputs) -> CacheResult<Value> {
    let (_, names) = structures(inputs)?;
    Ok(serde_json::to_value(names)?)
}
