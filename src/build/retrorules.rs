//! RetroRules transforms: reaction rules and template reactions

use super::tsv::{Header, Table};
use super::BuildInputs;
use crate::error::CacheResult;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Number, Value};
use tracing::{debug, warn};

const RULES: &str = "retrorules_rr02_flat_all.tsv.gz";
const RECIPES: &str = "rxn_recipes.tsv.gz";

/// Non-numeric stoichiometric coefficients and the value used for each
const STOICHIOMETRY_RESCUE: &[(&str, i64)] = &[
    ("4n", 4),
    ("3n", 3),
    ("2n", 2),
    ("n", 1),
    ("(n)", 1),
    ("(N)", 1),
    ("(2n)", 2),
    ("(x)", 1),
    ("N", 1),
    ("m", 1),
    ("q", 1),
    ("0.01", 1),
    ("0.1", 1),
    ("0.5", 1),
    ("1.5", 1),
    ("0.02", 1),
    ("0.2", 1),
    ("(n-1)", 0),
    ("(n-2)", -1),
];

/// One reaction of a reaction rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleReaction {
    pub rule_id: String,
    pub rule_score: f64,
    pub reac_id: String,
    pub subs_id: String,
    pub rel_direction: i64,
    pub left: IndexMap<String, u32>,
    pub right: IndexMap<String, u32>,
}

/// A full template reaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateReaction {
    pub left: IndexMap<String, Number>,
    pub right: IndexMap<String, Number>,
    pub direction: i64,
    pub main_left: Vec<String>,
    pub main_right: Vec<String>,
}

/// Rule id to `reaction id -> rule reaction`
pub fn rr_reactions(inputs: &BuildInputs) -> CacheResult<Value> {
    let text = inputs.text(RULES)?;
    let table = Table::parse(&text, Header::FirstLine);
    table.require(
        RULES,
        &[
            "Rule_ID",
            "Reaction_ID",
            "Substrate_ID",
            "Product_IDs",
            "Score_normalized",
            "Rule_relative_direction",
        ],
    )?;

    let mut rules: IndexMap<String, IndexMap<String, RuleReaction>> = IndexMap::new();
    for row in table.rows() {
        let field = |column: &str| row.get(column).unwrap_or_default();
        let rule_id = field("Rule_ID");
        let reac_id = field("Reaction_ID");
        let subs_id = field("Substrate_ID");

        let (Ok(rule_score), Ok(rel_direction)) = (
            field("Score_normalized").trim().parse::<f64>(),
            field("Rule_relative_direction").trim().parse::<i64>(),
        ) else {
            warn!(
                "Rule {}: cannot convert score '{}' or direction '{}'",
                rule_id,
                field("Score_normalized"),
                field("Rule_relative_direction")
            );
            continue;
        };

        let mut right: IndexMap<String, u32> = IndexMap::new();
        for product in field("Product_IDs").split('.') {
            *right.entry(product.to_string()).or_default() += 1;
        }

        let reactions = rules.entry(rule_id.to_string()).or_default();
        if reactions.contains_key(reac_id) {
            warn!("Reaction {} listed twice in rule {}", reac_id, rule_id);
        }
        reactions.insert(
            reac_id.to_string(),
            RuleReaction {
                rule_id: rule_id.to_string(),
                rule_score,
                reac_id: reac_id.to_string(),
                subs_id: subs_id.to_string(),
                rel_direction,
                left: IndexMap::from([(subs_id.to_string(), 1)]),
                right,
            },
        );
    }

    debug!("{} reaction rules", rules.len());
    Ok(serde_json::to_value(rules)?)
}

/// Reaction id to template reaction, deprecated ids included
pub fn template_reactions(inputs: &BuildInputs) -> CacheResult<Value> {
    let text = inputs.text(RECIPES)?;
    let deprecated = inputs.attr_object("deprecatedRID_rid")?;
    let table = Table::parse(&text, Header::FirstLine);
    table.require(
        RECIPES,
        &["Reaction_ID", "Equation", "Direction", "Main_left", "Main_right"],
    )?;

    let mut reactions: IndexMap<String, TemplateReaction> = IndexMap::new();
    for row in table.rows() {
        let field = |column: &str| row.get(column).unwrap_or_default();
        let id = field("Reaction_ID");

        let Some((left, right)) = parse_equation(field("Equation")) else {
            warn!("Ignoring reaction {}: cannot parse equation '{}'", id, field("Equation"));
            continue;
        };
        let Ok(direction) = field("Direction").trim().parse::<i64>() else {
            warn!("Ignoring reaction {}: cannot convert direction '{}'", id, field("Direction"));
            continue;
        };

        reactions.insert(
            id.to_string(),
            TemplateReaction {
                left,
                right,
                direction,
                main_left: split_list(field("Main_left")),
                main_right: split_list(field("Main_right")),
            },
        );
    }

    let mut missing = 0usize;
    for (old, new) in deprecated {
        match new.as_str().and_then(|new| reactions.get(new)).cloned() {
            Some(reaction) => {
                reactions.insert(old.clone(), reaction);
            }
            None => missing += 1,
        }
    }
    if missing > 0 {
        warn!("{} deprecated reaction ids point to reactions missing from {}", missing, RECIPES);
    }

    debug!("{} template reactions", reactions.len());
    Ok(serde_json::to_value(reactions)?)
}

type Side = IndexMap<String, Number>;

/// Parse `1 MNXM1@MNXD1 + 2 MNXM2@MNXD1 = 1 MNXM3@MNXD1` into both sides
pub fn parse_equation(equation: &str) -> Option<(Side, Side)> {
    let mut sides = equation.split('=');
    let (Some(left), Some(right), None) = (sides.next(), sides.next(), sides.next()) else {
        return None;
    };
    Some((parse_side(left)?, parse_side(right)?))
}

fn parse_side(side: &str) -> Option<Side> {
    let mut species = Side::new();
    let tokens: Vec<&str> = side.split_whitespace().collect();
    for pair in tokens.windows(2) {
        let Some(id) = species_id(pair[1]) else {
            continue;
        };
        species.insert(id.to_string(), coefficient(pair[0])?);
    }
    Some(species)
}

/// Species part of `SPECIES@COMPARTMENT`
fn species_id(token: &str) -> Option<&str> {
    let (id, compartment) = token.split_once('@')?;
    let word = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_');
    (word(id) && word(compartment)).then_some(id)
}

fn coefficient(token: &str) -> Option<Number> {
    if let Some((_, value)) = STOICHIOMETRY_RESCUE.iter().find(|(t, _)| *t == token) {
        return Some(Number::from(*value));
    }
    if !token.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    token.parse::<f64>().ok().and_then(Number::from_f64)
}

fn split_list(field: &str) -> Vec<String> {
    field.split(',').map(str::to_string).collect()
}
