//! Field renaming stages
//!
//! Fields are addressed by their full path, prefixed with the document side
//! (`key.address.city`, `value.first-name`). A rename never overwrites a field
//! that already exists under the new name. Sub-documents, including those
//! inside arrays, are renamed recursively under their original path.

use std::ops::ControlFlow;
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::config::ValidatedConfig;
use crate::error::SinkResult;
use crate::projection::SUB_FIELD_SEPARATOR;
use crate::record::{Document, RecordCoordinates, Side, SinkDocument};
use crate::rename::RenameRuleSet;

use super::{PostProcessor, RENAME_BY_MAPPING, RENAME_BY_REGEXP};

/// Which rule table drives the renaming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameBy {
    Mapping,
    Regexp,
}

#[derive(Debug, Clone)]
pub struct FieldRenamer {
    by: RenameBy,
    rules: RenameRuleSet,
}

impl FieldRenamer {
    pub fn new(by: RenameBy, rules: RenameRuleSet) -> Self {
        Self { by, rules }
    }

    pub fn rules(&self) -> &RenameRuleSet {
        &self.rules
    }

    fn renamed(&self, path: &str, name: &str) -> Option<String> {
        let renamed = match self.by {
            RenameBy::Mapping => self.rules.mapped_name(path)?.to_string(),
            RenameBy::Regexp => self.rules.regexp_name(path, name),
        };
        (renamed != name).then_some(renamed)
    }

    fn rename_fields(&self, prefix: &str, doc: &mut Document) {
        let fields = std::mem::take(doc);
        let originals: Vec<String> = fields.keys().cloned().collect();

        for (name, mut value) in fields {
            let path = format!("{}{}{}", prefix, SUB_FIELD_SEPARATOR, name);
            self.rename_nested(&path, &mut value);

            let target = match self.renamed(&path, &name) {
                Some(new_name) if !originals.contains(&new_name) && !doc.contains_key(&new_name) => {
                    trace!("renaming {} to {}", path, new_name);
                    new_name
                }
                _ => name,
            };
            doc.insert(target, value);
        }
    }

    fn rename_nested(&self, path: &str, value: &mut Value) {
        match value {
            Value::Object(sub) => self.rename_fields(path, sub),
            Value::Array(items) => {
                for item in items.iter_mut() {
                    if let Value::Object(sub) = item {
                        self.rename_fields(path, sub);
                    }
                }
            }
            _ => {}
        }
    }
}

impl PostProcessor for FieldRenamer {
    fn process(
        &self,
        doc: &mut SinkDocument,
        _coords: &RecordCoordinates,
    ) -> SinkResult<ControlFlow<()>> {
        for side in [Side::Key, Side::Value] {
            if let Some(document) = side.of_mut(doc) {
                self.rename_fields(side.as_str(), document);
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    fn name(&self) -> &str {
        match self.by {
            RenameBy::Mapping => RENAME_BY_MAPPING,
            RenameBy::Regexp => RENAME_BY_REGEXP,
        }
    }
}

pub(crate) fn by_mapping(config: &ValidatedConfig) -> SinkResult<Arc<dyn PostProcessor>> {
    Ok(Arc::new(FieldRenamer::new(
        RenameBy::Mapping,
        RenameRuleSet::compile(config.field_renamer_mapping(), "")?,
    )))
}

pub(crate) fn by_regexp(config: &ValidatedConfig) -> SinkResult<Arc<dyn PostProcessor>> {
    Ok(Arc::new(FieldRenamer::new(
        RenameBy::Regexp,
        RenameRuleSet::compile("", config.field_renamer_regexp())?,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validate;
    use crate::error::SinkError;
    use serde_json::json;
    use std::collections::HashMap;

    fn run(renamer: &FieldRenamer, key: Value, value: Value) -> SinkDocument {
        let mut doc = SinkDocument::from_json(Some(key), Some(value)).unwrap();
        assert!(renamer
            .process(&mut doc, &RecordCoordinates::new("t", 0, 0))
            .unwrap()
            .is_continue());
        doc
    }

    fn object(doc: Option<Document>) -> Value {
        Value::Object(doc.unwrap_or_default())
    }

    fn config(pairs: &[(&str, &str)]) -> ValidatedConfig {
        let raw: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        validate(&raw).unwrap()
    }

    #[test]
    fn test_factories_compile_only_their_table() {
        let broken_regexp = config(&[
            ("mongodb.field.renamer.mapping", r#"[{"oldName":"value.a","newName":"b"}]"#),
            ("mongodb.field.renamer.regexp", "not json"),
        ]);
        let stage = by_mapping(&broken_regexp).unwrap();
        assert_eq!(stage.name(), RENAME_BY_MAPPING);
        assert!(matches!(
            by_regexp(&broken_regexp).err(),
            Some(SinkError::InvalidRenameSpec { key: "mongodb.field.renamer.regexp", .. })
        ));

        let broken_mapping = config(&[
            ("mongodb.field.renamer.mapping", "[{oldName:"),
            ("mongodb.field.renamer.regexp", r#"[{"regexp":"^value\\..*$","pattern":"a","replace":"b"}]"#),
        ]);
        assert!(by_regexp(&broken_mapping).is_ok());
        assert!(matches!(
            by_mapping(&broken_mapping).err(),
            Some(SinkError::InvalidRenameSpec { key: "mongodb.field.renamer.mapping", .. })
        ));
    }

    #[test]
    fn test_rename_by_mapping() {
        let rules = RenameRuleSet::compile(
            r#"[
                {"oldName":"key.id","newName":"key_id"},
                {"oldName":"value.user.fullname","newName":"name"},
                {"oldName":"value.total","newName":"amount"}
            ]"#,
            "",
        )
        .unwrap();
        let renamer = FieldRenamer::new(RenameBy::Mapping, rules);

        let doc = run(
            &renamer,
            json!({"id": 1}),
            json!({"user": {"fullname": "Ada", "age": 36}, "total": 9, "id": 2}),
        );
        assert_eq!(object(doc.key), json!({"key_id": 1}));
        assert_eq!(
            object(doc.value),
            json!({"user": {"name": "Ada", "age": 36}, "amount": 9, "id": 2})
        );
    }

    #[test]
    fn test_existing_field_not_overwritten() {
        let rules =
            RenameRuleSet::compile(r#"[{"oldName":"value.a","newName":"b"}]"#, "").unwrap();
        let renamer = FieldRenamer::new(RenameBy::Mapping, rules);

        let doc = run(&renamer, json!({}), json!({"a": 1, "b": 2}));
        assert_eq!(object(doc.value), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_rename_by_regexp() {
        let rules = RenameRuleSet::compile(
            "",
            r#"[
                {"regexp":"^key\\..*my.*$","pattern":"my","replace":""},
                {"regexp":"^value\\..*-.+$","pattern":"-","replace":"_"}
            ]"#,
        )
        .unwrap();
        let renamer = FieldRenamer::new(RenameBy::Regexp, rules);
        assert_eq!(renamer.name(), RENAME_BY_REGEXP);

        let doc = run(
            &renamer,
            json!({"myid": 1}),
            json!({"first-name": "Ada", "items": [{"unit-price": 3}], "my-key": true}),
        );
        assert_eq!(object(doc.key), json!({"id": 1}));
        assert_eq!(
            object(doc.value),
            json!({"first_name": "Ada", "items": [{"unit_price": 3}], "my_key": true})
        );
    }
}
