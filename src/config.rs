//! Schema-bound configuration: permitted tables, fields, relationships,
//! runtime variables, and the target dialect.
//!
//! A `Config` is read-only after construction; every compile borrows it.
//! The legacy shape that declares per-table `foreignKeys` instead of
//! explicit `relationships` is accepted and normalized at construction.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::ast::Primitive;
use crate::dialect::Dialect;
use crate::error::{Error, Result};

// =============================================================================
// Semantic types
// =============================================================================

/// The inferred abstract type of an expression or declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    String,
    Number,
    Boolean,
    Uuid,
    Date,
    Datetime,
    /// JSON document storage; traversable with `->` paths.
    Object,
    Unknown,
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SemanticType::String => "string",
            SemanticType::Number => "number",
            SemanticType::Boolean => "boolean",
            SemanticType::Uuid => "uuid",
            SemanticType::Date => "date",
            SemanticType::Datetime => "datetime",
            SemanticType::Object => "object",
            SemanticType::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

// =============================================================================
// Fields and tables
// =============================================================================

/// A permitted column: name, semantic type, nullability, optional default.
///
/// Defaults are raw expression values, materialized on INSERT when the
/// caller omits the field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: SemanticType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<Value>,
}

/// Legacy implicit-relationship declaration on a table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForeignKey {
    pub field: String,
    #[serde(rename = "referencesTable", alias = "references_table")]
    pub references_table: String,
    #[serde(rename = "referencesField", alias = "references_field")]
    pub references_field: String,
}

/// Configuration for one permitted table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableConfig {
    #[serde(rename = "allowedFields", alias = "allowed_fields")]
    pub allowed_fields: Vec<Field>,
    /// Raw condition ANDed into every statement touching this logical table.
    /// Only meaningful for data-storage tables.
    #[serde(default)]
    pub constraints: Option<Value>,
    #[serde(rename = "foreignKeys", alias = "foreign_keys", default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableConfig {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.allowed_fields.iter().find(|f| f.name == name)
    }
}

// =============================================================================
// Relationships
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RelationshipKind {
    #[serde(rename = "one-to-one")]
    OneToOne,
    #[serde(rename = "one-to-many")]
    OneToMany,
    #[serde(rename = "many-to-one")]
    ManyToOne,
    #[serde(rename = "many-to-many")]
    ManyToMany,
}

/// A join edge between two tables. Matching is symmetric: either endpoint
/// may be the current table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Relationship {
    #[serde(rename = "fromTable", alias = "from_table")]
    pub from_table: String,
    #[serde(rename = "fromField", alias = "from_field")]
    pub from_field: String,
    #[serde(rename = "toTable", alias = "to_table")]
    pub to_table: String,
    #[serde(rename = "toField", alias = "to_field")]
    pub to_field: String,
    #[serde(rename = "type", alias = "kind")]
    pub kind: RelationshipKind,
}

impl Relationship {
    /// Orient this edge as `(current_field, partner_field)` when it links
    /// `current` to `partner`, in either declared direction.
    pub fn orient(&self, current: &str, partner: &str) -> Option<(&str, &str)> {
        if self.from_table == current && self.to_table == partner {
            Some((&self.from_field, &self.to_field))
        } else if self.from_table == partner && self.to_table == current {
            Some((&self.to_field, &self.from_field))
        } else {
            None
        }
    }
}

// =============================================================================
// Data table virtualization
// =============================================================================

/// A single physical JSON-storage table virtualized as multiple logical
/// tables, discriminated by `table_field`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataTableConfig {
    pub table: String,
    #[serde(rename = "tableField", alias = "table_field")]
    pub table_field: String,
    #[serde(rename = "dataField", alias = "data_field")]
    pub data_field: String,
}

// =============================================================================
// Config
// =============================================================================

/// The schema-bound compiler configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub dialect: Dialect,
    pub tables: HashMap<String, TableConfig>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub variables: HashMap<String, Primitive>,
    #[serde(rename = "dataTable", alias = "data_table", default)]
    pub data_table: Option<DataTableConfig>,
}

impl Config {
    /// Deserialize a raw config value and normalize legacy `foreignKeys`
    /// declarations into explicit relationships.
    pub fn from_value(value: Value) -> Result<Self> {
        let config: Config = serde_json::from_value(value)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        Ok(config.normalized())
    }

    /// Drain per-table `foreignKeys` into `relationships`. A foreign key on
    /// `t.field` referencing `other.other_field` is a many-to-one edge.
    pub fn normalized(mut self) -> Self {
        let mut table_names: Vec<&String> = self.tables.keys().collect();
        table_names.sort();

        let mut extra = Vec::new();
        for name in table_names {
            let table = &self.tables[name];
            for fk in &table.foreign_keys {
                extra.push(Relationship {
                    from_table: name.clone(),
                    from_field: fk.field.clone(),
                    to_table: fk.references_table.clone(),
                    to_field: fk.references_field.clone(),
                    kind: RelationshipKind::ManyToOne,
                });
            }
        }
        self.relationships.extend(extra);
        for table in self.tables.values_mut() {
            table.foreign_keys.clear();
        }
        self
    }

    pub fn table(&self, name: &str) -> Result<&TableConfig> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    pub fn field(&self, table: &str, name: &str) -> Result<&Field> {
        self.table(table)?
            .field(name)
            .ok_or_else(|| Error::DisallowedField {
                table: table.to_string(),
                field: name.to_string(),
            })
    }

    /// Find the relationship linking `current` and `partner`, oriented as
    /// `(current_field, partner_field)`.
    pub fn relationship(&self, current: &str, partner: &str) -> Option<(&Relationship, &str, &str)> {
        self.relationships.iter().find_map(|r| {
            r.orient(current, partner)
                .map(|(cur, par)| (r, cur, par))
        })
    }

    pub fn variable(&self, name: &str) -> Result<&Primitive> {
        self.variables
            .get(name)
            .ok_or_else(|| Error::UnknownVariable(name.to_string()))
    }
}
