use super::rule::Rule;
use crate::payload::{DType, Metadata};
use serde::{Deserialize, Serialize};

/// A serializable description of a registered rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleInfo {
    pub name: String,
    pub dependencies: Vec<String>,
    pub description: String,
    pub metadata: Metadata,
    pub formula: Option<String>,
    pub standard_name: Option<String>,
    pub long_name: Option<String>,
    pub output_dims_hint: Option<Vec<String>>,
    pub output_dtype_hint: Option<DType>,
}

impl From<&Rule> for RuleInfo {
    fn from(rule: &Rule) -> Self {
        Self {
            name: rule.name().to_string(),
            dependencies: rule.dependencies().to_vec(),
            description: rule.description().to_string(),
            metadata: rule.metadata().clone(),
            formula: rule.formula().map(str::to_string),
            standard_name: rule.standard_name().map(str::to_string),
            long_name: rule.long_name().map(str::to_string),
            output_dims_hint: rule.output_dims_hint().map(<[String]>::to_vec),
            output_dtype_hint: rule.output_dtype_hint(),
        }
    }
}

/// Text fields a keyword search can look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Name,
    Description,
    StandardName,
    LongName,
    Formula,
    /// Every string value in the metadata map.
    Metadata,
}

pub const DEFAULT_SEARCH_FIELDS: &[SearchField] = &[
    SearchField::Name,
    SearchField::Description,
    SearchField::StandardName,
    SearchField::LongName,
    SearchField::Formula,
];

impl SearchField {
    /// Case-insensitive substring match. `needle` must already be lowercase.
    pub(crate) fn matches(self, rule: &Rule, needle: &str) -> bool {
        let hit = |s: &str| s.to_lowercase().contains(needle);
        match self {
            SearchField::Name => hit(rule.name()),
            SearchField::Description => hit(rule.description()),
            SearchField::StandardName => rule.standard_name().is_some_and(hit),
            SearchField::LongName => rule.long_name().is_some_and(hit),
            SearchField::Formula => rule.formula().is_some_and(hit),
            SearchField::Metadata => rule
                .metadata()
                .values()
                .any(|v| v.as_str().is_some_and(hit)),
        }
    }
}
