//! Serde mapping of the schema document.
//!
//! Property maps deserialise in key order, so a document's declared property order is the
//! lexicographic order of the property names.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{predicate::Predicate, schema::aggregate::AggregateFunction, value::ValueKind};

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub types: BTreeMap<String, TypeDocument>,
    #[serde(default)]
    pub entities: BTreeMap<String, EntityDocument>,
    #[serde(default)]
    pub edges: BTreeMap<String, EdgeDocument>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDocument {
    pub value_kind: ValueKind,
    /// Built-in serialiser name; the kind's default when absent.
    #[serde(default)]
    pub serialiser: Option<String>,
    #[serde(default)]
    pub aggregate_function: Option<AggregateFunction>,
    #[serde(default)]
    pub validator: Option<Predicate>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDocument {
    pub vertex_type: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default = "default_true")]
    pub aggregate: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDocument {
    pub source_type: String,
    pub destination_type: String,
    #[serde(default)]
    pub directed: Option<bool>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default = "default_true")]
    pub aggregate: bool,
}
