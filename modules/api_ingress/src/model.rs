use std::collections::BTreeMap;

use utoipa::openapi::{schema::Schema, RefOr};

/// Outcome of offering a schema to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaInsert {
    Inserted,
    /// Same name, same content: nothing to do.
    Identical,
    /// Same name, different content: the first registration is kept.
    Conflict,
}

#[derive(Default, Clone)]
pub struct ComponentsRegistry {
    /// Schema name -> schema (serialized to components.schemas)
    pub schemas: BTreeMap<String, RefOr<Schema>>,
}

impl ComponentsRegistry {
    /// Register a schema component; the first registration of a name wins.
    pub fn register_schema(&mut self, name: impl Into<String>, schema: RefOr<Schema>) -> SchemaInsert {
        let name = name.into();
        match self.schemas.get(&name) {
            None => {
                self.schemas.insert(name, schema);
                SchemaInsert::Inserted
            }
            Some(existing) if same_content(existing, &schema) => SchemaInsert::Identical,
            Some(_) => SchemaInsert::Conflict,
        }
    }

    pub fn has_schema(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }
}

// utoipa schemas have no PartialEq; compare their serialized forms.
fn same_content(a: &RefOr<Schema>, b: &RefOr<Schema>) -> bool {
    match (serde_json::to_value(a), serde_json::to_value(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
