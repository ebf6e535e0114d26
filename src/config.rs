//! Store properties and backend selection.
//!
//! [`StoreProperties`] picks a backend and carries the options of every backend, so one
//! properties document can be switched between backends by changing `backend` alone.
//!
//! ```rust
//! use fedgraph::{BackendKind, StoreProperties};
//!
//! let props = StoreProperties::from_json_str(r#"{"backend": "sqlite", "sqlite": {"page_size": 32}}"#)
//!     .expect("properties");
//! assert_eq!(props.backend, BackendKind::Sqlite);
//! assert_eq!(props.sqlite.page_size, 32);
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    errors::GraphError,
    federation::{FederatedStore, MergePolicy},
    schema::Schema,
    store::{MapStore, Store},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-memory store, lost on drop.
    #[default]
    Map,
    /// SQLite file or in-memory database.
    Sqlite,
    /// A federation of delegate graphs added at runtime.
    Federated,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Pre-allocated element slots.
    pub initial_capacity: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file; an in-memory database when absent.
    pub path: Option<PathBuf>,
    /// Extra `PRAGMA name = value` statements applied after opening.
    pub pragma_settings: BTreeMap<String, String>,
    /// Rows fetched per cursor page.
    pub page_size: usize,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: None,
            pragma_settings: BTreeMap::new(),
            page_size: 256,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FederatedConfig {
    /// Upper bound on delegates queried concurrently.
    pub max_workers: usize,
    /// Policy used when an operation does not choose one.
    pub merge_policy: MergePolicy,
}

impl Default for FederatedConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            merge_policy: MergePolicy::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreProperties {
    pub backend: BackendKind,
    pub map: MapConfig,
    pub sqlite: SqliteConfig,
    pub federated: FederatedConfig,
}

impl StoreProperties {
    pub fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    pub fn map() -> Self {
        Self::new(BackendKind::Map)
    }

    pub fn sqlite() -> Self {
        Self::new(BackendKind::Sqlite)
    }

    pub fn federated() -> Self {
        Self::new(BackendKind::Federated)
    }

    pub fn from_json_str(json: &str) -> Result<Self, GraphError> {
        serde_json::from_str(json).map_err(|e| GraphError::invalid_input(e.to_string()))
    }
}

/// Create the store `properties` selects.
pub fn open_store(
    graph_id: &str,
    schema: Schema,
    properties: &StoreProperties,
) -> Result<Arc<dyn Store>, GraphError> {
    match properties.backend {
        BackendKind::Map => Ok(Arc::new(MapStore::initialise(graph_id, schema, properties)?)),
        #[cfg(feature = "sqlite-backend")]
        BackendKind::Sqlite => Ok(Arc::new(crate::store::SqliteStore::initialise(
            graph_id, schema, properties,
        )?)),
        #[cfg(not(feature = "sqlite-backend"))]
        BackendKind::Sqlite => Err(GraphError::store(
            "built without the sqlite-backend feature",
        )),
        BackendKind::Federated => Ok(Arc::new(FederatedStore::initialise(
            graph_id, schema, properties,
        )?)),
    }
}
