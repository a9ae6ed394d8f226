//! Field projection for key and value documents
//!
//! A [`ProjectionPolicy`] is compiled once from a projection type and a comma
//! separated field list. Block lists keep the listed paths verbatim. Allow
//! lists store every left-anchored prefix of every path (`a.b.c` stores `a`,
//! `a.b` and `a.b.c`), so a recursive walk can decide at each depth with a
//! plain membership test whether a sub-document is still reachable.
//!
//! Paths are dot-delimited. `*` stands for any single field name at its level
//! and `**` for everything at and below its level. `_id` is never projected
//! away.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

use crate::config::ValidatedConfig;
use crate::error::{SinkError, SinkResult};
use crate::record::{Document, ID_FIELD};

pub const FIELD_LIST_SEPARATOR: char = ',';
pub const SUB_FIELD_SEPARATOR: char = '.';
pub const SINGLE_WILDCARD: &str = "*";
pub const DOUBLE_WILDCARD: &str = "**";

/// Which projection, if any, applies to a document side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectionMode {
    /// No projection; documents pass through untouched
    None,
    /// Listed fields are removed
    BlockList,
    /// Only listed fields (and their parents) are kept
    AllowList,
}

impl ProjectionMode {
    pub const NAMES: &'static [&'static str] = &["none", "blacklist", "whitelist"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectionMode::None => "none",
            ProjectionMode::BlockList => "blacklist",
            ProjectionMode::AllowList => "whitelist",
        }
    }

    /// Parse the projection type read from the setting `key`
    pub fn parse_setting(key: &'static str, value: &str) -> SinkResult<Self> {
        match value.to_ascii_lowercase().as_str() {
            "none" => Ok(ProjectionMode::None),
            "blacklist" => Ok(ProjectionMode::BlockList),
            "whitelist" => Ok(ProjectionMode::AllowList),
            _ => Err(SinkError::InvalidProjectionMode {
                key,
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for ProjectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiled set-membership policy over field paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionPolicy {
    mode: ProjectionMode,
    fields: HashSet<String>,
}

impl ProjectionPolicy {
    /// Compile a policy from a typed mode and a raw field list
    pub fn build(mode: ProjectionMode, field_list: &str) -> Self {
        let listed = field_list
            .split(FIELD_LIST_SEPARATOR)
            .map(str::trim)
            .filter(|f| !f.is_empty());

        let fields = match mode {
            ProjectionMode::None => HashSet::new(),
            ProjectionMode::BlockList => listed.map(str::to_string).collect(),
            ProjectionMode::AllowList => listed.flat_map(path_prefixes).collect(),
        };

        Self { mode, fields }
    }

    /// Compile a policy from the raw projection type read from `key`
    pub fn parse(key: &'static str, mode: &str, field_list: &str) -> SinkResult<Self> {
        Ok(Self::build(
            ProjectionMode::parse_setting(key, mode)?,
            field_list,
        ))
    }

    /// Key-side policy from `mongodb.key.projection.*`
    pub fn for_key(config: &ValidatedConfig) -> Self {
        Self::build(config.key_projection_type(), config.key_projection_list())
    }

    /// Value-side policy from `mongodb.value.projection.*`
    pub fn for_value(config: &ValidatedConfig) -> Self {
        Self::build(config.value_projection_type(), config.value_projection_list())
    }

    pub fn mode(&self) -> ProjectionMode {
        self.mode
    }

    pub fn fields(&self) -> &HashSet<String> {
        &self.fields
    }

    pub fn contains(&self, path: &str) -> bool {
        self.fields.contains(path)
    }

    /// Project a document in place according to the policy
    pub fn apply(&self, doc: &mut Document) {
        match self.mode {
            ProjectionMode::None => {}
            ProjectionMode::BlockList => {
                for path in &self.fields {
                    block_path(path, doc);
                }
            }
            ProjectionMode::AllowList => self.allow("", doc),
        }
    }

    fn allow(&self, prefix: &str, doc: &mut Document) {
        if self.fields.contains(DOUBLE_WILDCARD) {
            return;
        }

        let names: Vec<String> = doc.keys().cloned().collect();
        for name in names {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}{}{}", prefix, SUB_FIELD_SEPARATOR, name)
            };

            if path != ID_FIELD && !self.fields.contains(&path) && !self.matches_wildcard(&path) {
                doc.remove(&name);
                continue;
            }

            if self
                .fields
                .contains(&format!("{}{}{}", path, SUB_FIELD_SEPARATOR, DOUBLE_WILDCARD))
            {
                continue;
            }

            match doc.get_mut(&name) {
                Some(Value::Object(sub)) => self.allow(&path, sub),
                Some(Value::Array(items)) => {
                    for item in items.iter_mut() {
                        if let Value::Object(sub) = item {
                            self.allow(&path, sub);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Whether any listed pattern matches `path` with some segments replaced by `*`
    fn matches_wildcard(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split(SUB_FIELD_SEPARATOR).collect();
        self.fields
            .iter()
            .filter(|pattern| pattern.contains(SINGLE_WILDCARD))
            .any(|pattern| {
                let segments: Vec<&str> = pattern.split(SUB_FIELD_SEPARATOR).collect();
                segments.len() == parts.len()
                    && segments
                        .iter()
                        .zip(&parts)
                        .all(|(segment, part)| *segment == SINGLE_WILDCARD || segment == part)
            })
    }
}

/// Every left-anchored prefix of a dotted path, the path itself included
fn path_prefixes(path: &str) -> Vec<String> {
    path.match_indices(SUB_FIELD_SEPARATOR)
        .map(|(idx, _)| path[..idx].to_string())
        .chain(std::iter::once(path.to_string()))
        .collect()
}

fn block_path(path: &str, doc: &mut Document) {
    match path.split_once(SUB_FIELD_SEPARATOR) {
        None => {
            if path == SINGLE_WILDCARD || path == DOUBLE_WILDCARD {
                block_wildcard(path, "", doc);
            } else if path != ID_FIELD {
                doc.remove(path);
            }
        }
        Some((first, rest)) => {
            if first == SINGLE_WILDCARD || first == DOUBLE_WILDCARD {
                block_wildcard(first, rest, doc);
                return;
            }
            match doc.get_mut(first) {
                Some(Value::Object(sub)) => block_path(rest, sub),
                Some(Value::Array(items)) => {
                    for item in items.iter_mut() {
                        if let Value::Object(sub) = item {
                            block_path(rest, sub);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

fn block_wildcard(wildcard: &str, rest: &str, doc: &mut Document) {
    if wildcard == DOUBLE_WILDCARD {
        doc.retain(|name, _| name == ID_FIELD);
        return;
    }

    // `*` drops every plain field at this level and descends into sub-documents
    doc.retain(|name, value| name == ID_FIELD || value.is_object());
    if rest.is_empty() {
        return;
    }
    for (name, value) in doc.iter_mut() {
        if name == ID_FIELD {
            continue;
        }
        if let Value::Object(sub) = value {
            block_path(rest, sub);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_none_is_empty() {
        let policy = ProjectionPolicy::build(ProjectionMode::None, "a,b");
        assert!(policy.fields().is_empty());
    }

    #[test]
    fn test_blacklist_keeps_paths_verbatim() {
        let policy = ProjectionPolicy::build(ProjectionMode::BlockList, "x,y");
        assert_eq!(policy.fields(), &set(&["x", "y"]));

        let policy = ProjectionPolicy::build(ProjectionMode::BlockList, "a.b.c");
        assert_eq!(policy.fields(), &set(&["a.b.c"]));
    }

    #[test]
    fn test_whitelist_expands_prefixes() {
        let policy = ProjectionPolicy::build(ProjectionMode::AllowList, "a.b.c,d");
        assert_eq!(policy.fields(), &set(&["a", "a.b", "a.b.c", "d"]));
        assert!(policy.contains("a.b"));
    }

    #[test]
    fn test_list_entries_are_trimmed() {
        let policy = ProjectionPolicy::build(ProjectionMode::BlockList, " x , ,y,");
        assert_eq!(policy.fields(), &set(&["x", "y"]));
    }

    #[test]
    fn test_parse_mode_strings() {
        let policy =
            ProjectionPolicy::parse("mongodb.value.projection.type", "WhiteList", "a.b").unwrap();
        assert_eq!(policy.mode(), ProjectionMode::AllowList);

        let err =
            ProjectionPolicy::parse("mongodb.key.projection.type", "greylist", "a").unwrap_err();
        assert!(matches!(
            err,
            SinkError::InvalidProjectionMode { key: "mongodb.key.projection.type", ref value }
                if value == "greylist"
        ));
        let message = err.to_string();
        assert!(message.contains("mongodb.key.projection.type"), "{message}");
        assert!(message.contains("greylist"), "{message}");
    }

    #[test]
    fn test_blacklist_apply() {
        let mut d = doc(json!({
            "_id": 1,
            "name": "Alice",
            "ssn": "123",
            "address": {"city": "Vienna", "zip": "1010"},
            "orders": [{"sku": "A", "price": 3}, {"sku": "B", "price": 4}]
        }));

        ProjectionPolicy::build(ProjectionMode::BlockList, "ssn,address.zip,orders.price,_id")
            .apply(&mut d);

        assert_eq!(
            Value::Object(d),
            json!({
                "_id": 1,
                "name": "Alice",
                "address": {"city": "Vienna"},
                "orders": [{"sku": "A"}, {"sku": "B"}]
            })
        );
    }

    #[test]
    fn test_blacklist_wildcards() {
        let mut d = doc(json!({"_id": 1, "a": 1, "b": {"c": 2, "d": 3}}));
        ProjectionPolicy::build(ProjectionMode::BlockList, "*").apply(&mut d);
        assert_eq!(Value::Object(d), json!({"_id": 1, "b": {"c": 2, "d": 3}}));

        let mut d = doc(json!({"_id": 1, "a": 1, "b": {"c": 2, "d": 3}}));
        ProjectionPolicy::build(ProjectionMode::BlockList, "*.c").apply(&mut d);
        assert_eq!(Value::Object(d), json!({"_id": 1, "b": {"d": 3}}));

        let mut d = doc(json!({"_id": 1, "a": 1, "b": {"c": 2}}));
        ProjectionPolicy::build(ProjectionMode::BlockList, "**").apply(&mut d);
        assert_eq!(Value::Object(d), json!({"_id": 1}));
    }

    #[test]
    fn test_whitelist_apply() {
        let mut d = doc(json!({
            "_id": 7,
            "name": "Alice",
            "ssn": "123",
            "address": {"city": "Vienna", "zip": "1010", "geo": {"lat": 1, "lon": 2}},
            "orders": [{"sku": "A", "price": 3}]
        }));

        ProjectionPolicy::build(ProjectionMode::AllowList, "name,address.geo.lat,orders.sku")
            .apply(&mut d);

        assert_eq!(
            Value::Object(d),
            json!({
                "_id": 7,
                "name": "Alice",
                "address": {"geo": {"lat": 1}},
                "orders": [{"sku": "A"}]
            })
        );
    }

    #[test]
    fn test_whitelist_wildcards() {
        let mut d = doc(json!({"a": {"x": 1, "y": {"z": 2}}, "b": 3}));
        ProjectionPolicy::build(ProjectionMode::AllowList, "a.*").apply(&mut d);
        assert_eq!(Value::Object(d), json!({"a": {"x": 1, "y": {}}}));

        let mut d = doc(json!({"a": {"x": 1, "y": {"z": 2}}, "b": 3}));
        ProjectionPolicy::build(ProjectionMode::AllowList, "a.**").apply(&mut d);
        assert_eq!(Value::Object(d), json!({"a": {"x": 1, "y": {"z": 2}}}));

        let mut d = doc(json!({"a": {"x": 1}, "b": 3}));
        ProjectionPolicy::build(ProjectionMode::AllowList, "**").apply(&mut d);
        assert_eq!(Value::Object(d), json!({"a": {"x": 1}, "b": 3}));
    }

    #[test]
    fn test_path_prefixes() {
        assert_eq!(path_prefixes("a"), vec!["a"]);
        assert_eq!(path_prefixes("a.b.c"), vec!["a", "a.b", "a.b.c"]);
    }
}
