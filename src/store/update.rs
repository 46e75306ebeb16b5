use serde_json::{Map, Value};

use super::StoreError;

/// A single field-level change applied by `DocumentStore::update`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Set(String, Value),
    Delete(String),
    /// Missing or null fields count as 0
    Increment(String, i64),
    /// Appends values not already present (JSON equality)
    ArrayUnion(String, Vec<Value>),
    /// Removes every element equal to one of the values
    ArrayRemove(String, Vec<Value>),
}

impl FieldUpdate {
    pub fn set(field: &str, value: impl Into<Value>) -> Self {
        FieldUpdate::Set(field.to_string(), value.into())
    }

    pub fn increment(field: &str, by: i64) -> Self {
        FieldUpdate::Increment(field.to_string(), by)
    }

    pub fn array_union(field: &str, values: Vec<Value>) -> Self {
        FieldUpdate::ArrayUnion(field.to_string(), values)
    }

    pub fn array_remove(field: &str, values: Vec<Value>) -> Self {
        FieldUpdate::ArrayRemove(field.to_string(), values)
    }

    pub fn field(&self) -> &str {
        match self {
            FieldUpdate::Set(f, _)
            | FieldUpdate::Delete(f)
            | FieldUpdate::Increment(f, _)
            | FieldUpdate::ArrayUnion(f, _)
            | FieldUpdate::ArrayRemove(f, _) => f,
        }
    }
}

/// Applies updates in order. Shared by every backend so the semantics
/// stay identical between the memory and Postgres stores.
pub fn apply_updates(doc: &mut Map<String, Value>, updates: &[FieldUpdate]) -> Result<(), StoreError> {
    for update in updates {
        match update {
            FieldUpdate::Set(field, value) => {
                doc.insert(field.clone(), value.clone());
            }
            FieldUpdate::Delete(field) => {
                doc.remove(field);
            }
            FieldUpdate::Increment(field, by) => {
                let current = match doc.get(field) {
                    None | Some(Value::Null) => 0,
                    Some(Value::Number(n)) => n.as_i64().ok_or_else(|| StoreError::TypeMismatch {
                        field: field.clone(),
                        expected: "integer",
                    })?,
                    Some(_) => {
                        return Err(StoreError::TypeMismatch {
                            field: field.clone(),
                            expected: "integer",
                        })
                    }
                };
                let next = current
                    .checked_add(*by)
                    .ok_or_else(|| StoreError::CounterOverflow(field.clone()))?;
                doc.insert(field.clone(), Value::from(next));
            }
            FieldUpdate::ArrayUnion(field, values) => {
                let array = array_field(doc, field)?;
                for value in values {
                    if !array.contains(value) {
                        array.push(value.clone());
                    }
                }
            }
            FieldUpdate::ArrayRemove(field, values) => {
                let array = array_field(doc, field)?;
                array.retain(|existing| !values.contains(existing));
            }
        }
    }
    Ok(())
}

fn array_field<'a>(doc: &'a mut Map<String, Value>, field: &str) -> Result<&'a mut Vec<Value>, StoreError> {
    let entry = doc.entry(field.to_string()).or_insert_with(|| Value::Array(Vec::new()));
    if entry.is_null() {
        *entry = Value::Array(Vec::new());
    }
    entry.as_array_mut().ok_or_else(|| StoreError::TypeMismatch {
        field: field.to_string(),
        expected: "array",
    })
}
