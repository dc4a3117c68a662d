//! Field scopes: where each flat form value lands in the nested `input.json`.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::schema::{FormField, FormSchema, FormValues};

pub const SCOPE_SEPARATOR: char = '/';

/// Scope of a field declared in `tab_id`: explicit `scope`, else `<tab>/<name>`.
pub fn resolve_scope(tab_id: &str, field: &FormField) -> String {
    match &field.scope {
        Some(scope) => scope.clone(),
        None => format!("{tab_id}{SCOPE_SEPARATOR}{}", field.name),
    }
}

/// `field name -> scope path`, computed once per form session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeMap {
    scopes: BTreeMap<String, String>,
}

impl ScopeMap {
    pub fn from_schema(schema: &FormSchema) -> Self {
        let scopes = schema
            .fields()
            .map(|(tab, field)| (field.name.clone(), resolve_scope(&tab.id, field)))
            .collect();
        let map = Self { scopes };
        for (a, b) in map.conflicts() {
            tracing::warn!(first = %a, second = %b, "form fields share a scope path");
        }
        map
    }

    pub fn get(&self, field_name: &str) -> Option<&str> {
        self.scopes.get(field_name).map(String::as_str)
    }

    pub fn insert(&mut self, field_name: impl Into<String>, scope: impl Into<String>) {
        self.scopes.insert(field_name.into(), scope.into());
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.scopes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Pairs of field names whose scopes are equal or where one is a path
    /// prefix of the other.
    pub fn conflicts(&self) -> Vec<(String, String)> {
        let entries: Vec<(&String, &String)> = self.scopes.iter().collect();
        let mut out = Vec::new();
        for (i, (name_a, scope_a)) in entries.iter().enumerate() {
            for (name_b, scope_b) in &entries[i + 1..] {
                if scope_a == scope_b
                    || is_path_prefix(scope_a, scope_b)
                    || is_path_prefix(scope_b, scope_a)
                {
                    out.push(((*name_a).clone(), (*name_b).clone()));
                }
            }
        }
        out
    }
}

fn is_path_prefix(prefix: &str, path: &str) -> bool {
    path.len() > prefix.len()
        && path.starts_with(prefix)
        && path[prefix.len()..].starts_with(SCOPE_SEPARATOR)
}

/// Nest flat values by their scopes.
///
/// Values without a scope are left out. Intermediate objects are created on
/// demand; when a path runs into a non-object value the first writer keeps
/// it and the later field is dropped. A leaf write replaces whatever was
/// there.
pub fn build_nested_document(values: &FormValues, scopes: &ScopeMap) -> Value {
    let mut root = Map::new();
    for (name, value) in values {
        let Some(scope) = scopes.get(name) else {
            continue;
        };
        let parts: Vec<&str> = scope.split(SCOPE_SEPARATOR).collect();
        let Some((leaf, parents)) = parts.split_last() else {
            continue;
        };

        if !insert_path(&mut root, parents, leaf, value.clone()) {
            tracing::warn!(field = %name, scope, "scope path blocked by an earlier value");
        }
    }
    Value::Object(root)
}

fn insert_path(map: &mut Map<String, Value>, parents: &[&str], leaf: &str, value: Value) -> bool {
    let Some((head, rest)) = parents.split_first() else {
        map.insert(leaf.to_string(), value);
        return true;
    };
    let slot = map
        .entry((*head).to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if slot.is_null() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(next) => insert_path(next, rest, leaf, value),
        _ => false,
    }
}

/// Inverse of [`build_nested_document`] for collision-free scope maps.
pub fn flatten_document(document: &Value, scopes: &ScopeMap) -> FormValues {
    let mut values = FormValues::new();
    for (name, scope) in scopes.iter() {
        let mut current = Some(document);
        for part in scope.split(SCOPE_SEPARATOR) {
            current = current.and_then(|v| v.get(part));
        }
        if let Some(value) = current {
            values.insert(name.to_string(), value.clone());
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, SectionDef, TabDef};
    use serde_json::json;

    fn schema() -> FormSchema {
        FormSchema {
            tabs: vec![TabDef {
                id: "grid".into(),
                label: "Grid".into(),
                sections: vec![SectionDef {
                    title: None,
                    column_count: 2,
                    fields: vec![
                        FormField::new("nx", "NX", FieldType::Number).with_default(10),
                        FormField::new("ny", "NY", FieldType::Number)
                            .with_default(20)
                            .with_scope("model/grid/ny"),
                    ],
                }],
            }],
        }
    }

    #[test]
    fn default_scope_is_tab_and_name() {
        let map = ScopeMap::from_schema(&schema());
        assert_eq!(map.get("nx"), Some("grid/nx"));
        assert_eq!(map.get("ny"), Some("model/grid/ny"));
    }

    #[test]
    fn builds_nested_document() {
        let schema = schema();
        let map = ScopeMap::from_schema(&schema);
        let doc = build_nested_document(&schema.default_values(), &map);
        assert_eq!(
            doc,
            json!({ "grid": { "nx": 10 }, "model": { "grid": { "ny": 20 } } })
        );
    }

    #[test]
    fn unscoped_values_are_skipped() {
        let map = ScopeMap::from_schema(&schema());
        let mut values = FormValues::new();
        values.insert("stray".into(), json!(1));
        assert_eq!(build_nested_document(&values, &map), json!({}));
    }

    #[test]
    fn blocked_path_keeps_first_value() {
        let mut map = ScopeMap::default();
        map.insert("a", "x");
        map.insert("b", "x/y");
        let mut values = FormValues::new();
        values.insert("a".into(), json!(5));
        values.insert("b".into(), json!(6));
        assert_eq!(build_nested_document(&values, &map), json!({ "x": 5 }));
        assert_eq!(map.conflicts(), vec![("a".to_string(), "b".to_string())]);
    }

    #[test]
    fn sibling_prefixes_are_not_conflicts() {
        let mut map = ScopeMap::default();
        map.insert("a", "run/step");
        map.insert("b", "run/steps");
        assert!(map.conflicts().is_empty());
    }

    #[test]
    fn flatten_reverses_build() {
        let schema = schema();
        let map = ScopeMap::from_schema(&schema);
        let values = schema.default_values();
        let doc = build_nested_document(&values, &map);
        assert_eq!(flatten_document(&doc, &map), values);
    }
}
