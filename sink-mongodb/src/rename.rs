//! Field rename rules
//!
//! Both rename settings hold an inline JSON array:
//!
//! ```json
//! [{"oldName": "value.user.fullname", "newName": "name"}]
//! [{"regexp": "^value\\..*$", "pattern": "-", "replace": "_"}]
//! ```
//!
//! Mapping keys are full field paths (`key.` or `value.` prefixed). A regexp
//! rule's `regexp` selects the full field paths it applies to; its `pattern`
//! and `replace` then rewrite the field name (`$1`-style group references).

use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;

use crate::config::{schema, ValidatedConfig};
use crate::error::{SinkError, SinkResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldnameMapping {
    old_name: String,
    new_name: String,
}

#[derive(Debug, Deserialize)]
struct RegExpSettings {
    regexp: String,
    pattern: String,
    replace: String,
}

/// Compiled pattern and replacement of one regexp rule
#[derive(Debug, Clone)]
pub struct PatternReplace {
    selector: Regex,
    pattern: Regex,
    replace: String,
}

impl PatternReplace {
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn replace(&self) -> &str {
        &self.replace
    }

    /// Whether the rule applies to the field at `path`
    pub fn selects(&self, path: &str) -> bool {
        self.selector.is_match(path)
    }

    pub fn apply(&self, name: &str) -> String {
        self.pattern
            .replace_all(name, self.replace.as_str())
            .into_owned()
    }
}

/// Exact-name and regexp rename tables, read-only once compiled
#[derive(Debug, Clone, Default)]
pub struct RenameRuleSet {
    mappings: HashMap<String, String>,
    /// Declaration order; a repeated lookup key replaces the earlier rule in place
    regexps: Vec<(String, PatternReplace)>,
}

impl RenameRuleSet {
    /// Compile both tables from their JSON settings; empty input yields an empty table
    pub fn compile(mapping_json: &str, regexp_json: &str) -> SinkResult<Self> {
        Ok(Self {
            mappings: parse_mappings(mapping_json)?,
            regexps: parse_regexps(regexp_json)?,
        })
    }

    pub fn from_config(config: &ValidatedConfig) -> SinkResult<Self> {
        Self::compile(config.field_renamer_mapping(), config.field_renamer_regexp())
    }

    pub fn mappings(&self) -> &HashMap<String, String> {
        &self.mappings
    }

    pub fn regexp(&self, lookup_key: &str) -> Option<&PatternReplace> {
        self.regexps
            .iter()
            .find(|(key, _)| key == lookup_key)
            .map(|(_, rule)| rule)
    }

    pub fn regexp_len(&self) -> usize {
        self.regexps.len()
    }

    /// New name for the field at `path`, if the mapping table renames it
    pub fn mapped_name(&self, path: &str) -> Option<&str> {
        self.mappings.get(path).map(String::as_str)
    }

    /// Field name after every regexp rule selecting `path` has been applied in order
    pub fn regexp_name(&self, path: &str, name: &str) -> String {
        self.regexps
            .iter()
            .filter(|(_, rule)| rule.selects(path))
            .fold(name.to_string(), |current, (_, rule)| rule.apply(&current))
    }
}

fn parse_mappings(settings: &str) -> SinkResult<HashMap<String, String>> {
    if settings.trim().is_empty() {
        return Ok(HashMap::new());
    }

    let entries: Vec<FieldnameMapping> = serde_json::from_str(settings).map_err(|e| {
        SinkError::InvalidRenameSpec {
            key: schema::FIELD_RENAMER_MAPPING,
            reason: "parsing rename fieldname mappings failed".to_string(),
            source: Some(Box::new(e)),
        }
    })?;

    Ok(entries
        .into_iter()
        .map(|e| (e.old_name, e.new_name))
        .collect())
}

fn parse_regexps(settings: &str) -> SinkResult<Vec<(String, PatternReplace)>> {
    if settings.trim().is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<RegExpSettings> = serde_json::from_str(settings).map_err(|e| {
        SinkError::InvalidRenameSpec {
            key: schema::FIELD_RENAMER_REGEXP,
            reason: "parsing rename regexp settings failed".to_string(),
            source: Some(Box::new(e)),
        }
    })?;

    let mut rules: Vec<(String, PatternReplace)> = Vec::with_capacity(entries.len());
    for entry in entries {
        let rule = PatternReplace {
            selector: compile_regex(&format!("^(?:{})$", entry.regexp))?,
            pattern: compile_regex(&entry.pattern)?,
            replace: entry.replace,
        };
        match rules.iter_mut().find(|(key, _)| *key == entry.regexp) {
            Some(existing) => existing.1 = rule,
            None => rules.push((entry.regexp, rule)),
        }
    }
    Ok(rules)
}

fn compile_regex(expression: &str) -> SinkResult<Regex> {
    Regex::new(expression).map_err(|e| SinkError::InvalidRenameSpec {
        key: schema::FIELD_RENAMER_REGEXP,
        reason: format!("invalid regular expression '{}'", expression),
        source: Some(Box::new(e)),
    })
}
