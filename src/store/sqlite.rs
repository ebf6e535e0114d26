//! SQLite backend storing the schema-driven element encoding.
//!
//! Every element is one row: group, one blob per identifier, the directed flag and the encoded
//! properties block. Undirected edges whose endpoints share a type are stored with the smaller
//! serialised endpoint first, so the physical orientation follows byte order and can differ from
//! the orientation the caller wrote. Reads page through rows by id and decode lazily.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter, types::Value};
use tracing::debug;

use crate::{
    config::{SqliteConfig, StoreProperties},
    context::Context,
    element::{
        Element,
        codec::{EncodedElement, decode_element, decode_properties, element_key, encode_element, encode_properties},
    },
    errors::GraphError,
    operation::{HandlerRegistry, OperationChain, OperationKind, OperationOutput, handlers},
    schema::Schema,
    store::{
        CursorGuard, ElementBackend, ElementScan, Store, StoreMetrics, StoreMetricsSnapshot,
        register_element_handlers,
    },
    stream::{Cursor, ResultStream},
    value::PropertyValue,
};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS elements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    element_key BLOB,
    grp TEXT NOT NULL,
    vertex_a BLOB NOT NULL,
    vertex_b BLOB,
    directed INTEGER NOT NULL,
    properties BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_elements_key ON elements(element_key);
CREATE INDEX IF NOT EXISTS idx_elements_vertex_a ON elements(vertex_a, id);
CREATE INDEX IF NOT EXISTS idx_elements_vertex_b ON elements(vertex_b, id);
";

const SELECT_COLUMNS: &str = "SELECT id, grp, vertex_a, vertex_b, directed, properties FROM elements";

fn sql_err(e: rusqlite::Error) -> GraphError {
    GraphError::store(e.to_string())
}

fn is_in_memory_connection(conn: &Connection) -> bool {
    match conn.pragma_query_value(None, "database_list", |row| {
        let name: String = row.get(2)?;
        Ok(name)
    }) {
        Ok(name) => name.is_empty() || name == ":memory:",
        Err(_) => true,
    }
}

struct SqliteShared {
    conn: Mutex<Connection>,
    schema: Arc<Schema>,
    metrics: Arc<StoreMetrics>,
    page_size: usize,
}

pub struct SqliteStore {
    graph_id: String,
    shared: Arc<SqliteShared>,
    handlers: HandlerRegistry<SqliteStore>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("graph_id", &self.graph_id)
            .field("page_size", &self.shared.page_size)
            .finish()
    }
}

impl SqliteStore {
    /// Open the database at `config.path`, or an in-memory one when no path is set.
    pub fn open(
        graph_id: impl Into<String>,
        schema: Schema,
        config: &SqliteConfig,
    ) -> Result<Self, GraphError> {
        let conn = match &config.path {
            Some(path) => Connection::open(path),
            None => Connection::open_in_memory(),
        }
        .map_err(sql_err)?;
        conn.set_prepared_statement_cache_capacity(64);

        if !is_in_memory_connection(&conn) {
            if conn.pragma_update(None, "journal_mode", "WAL").is_err() {
                let _ = conn.pragma_update(None, "journal_mode", "DELETE");
            }
            let _ = conn.pragma_update(None, "synchronous", "NORMAL");
        }
        for (name, value) in &config.pragma_settings {
            conn.pragma_update(None, name, value).map_err(sql_err)?;
        }
        conn.execute_batch(SCHEMA_SQL).map_err(sql_err)?;

        let mut handlers = HandlerRegistry::new();
        handlers::register_defaults(&mut handlers);
        register_element_handlers(&mut handlers);
        Ok(Self {
            graph_id: graph_id.into(),
            shared: Arc::new(SqliteShared {
                conn: Mutex::new(conn),
                schema: Arc::new(schema),
                metrics: Arc::new(StoreMetrics::default()),
                page_size: config.page_size.max(1),
            }),
            handlers,
        })
    }

    pub fn in_memory(graph_id: impl Into<String>, schema: Schema) -> Result<Self, GraphError> {
        Self::open(graph_id, schema, &SqliteConfig::default())
    }

    /// Number of stored rows.
    pub fn row_count(&self) -> Result<u64, GraphError> {
        let conn = self.shared.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM elements", [], |row| row.get(0))
            .map_err(sql_err)?;
        Ok(count as u64)
    }

    /// Raw identifier blocks of every stored row, in insertion order.
    pub fn stored_orientations(&self) -> Result<Vec<(Vec<u8>, Option<Vec<u8>>)>, GraphError> {
        let conn = self.shared.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT vertex_a, vertex_b FROM elements ORDER BY id")
            .map_err(sql_err)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(sql_err)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(sql_err)?);
        }
        Ok(out)
    }
}

/// Identifier blocks in physical order.
fn physical_order(schema: &Schema, encoded: &EncodedElement) -> (Vec<u8>, Option<Vec<u8>>) {
    match encoded.identifiers.as_slice() {
        [a, b] => {
            let same_type = schema
                .element_definition(&encoded.group)
                .is_some_and(|definition| definition.identifiers()[0] == definition.identifiers()[1]);
            if !encoded.directed && same_type && b < a {
                (b.clone(), Some(a.clone()))
            } else {
                (a.clone(), Some(b.clone()))
            }
        }
        [a] => (a.clone(), None),
        _ => (Vec::new(), None),
    }
}

impl Store for SqliteStore {
    fn initialise(
        graph_id: &str,
        schema: Schema,
        properties: &StoreProperties,
    ) -> Result<Self, GraphError> {
        Self::open(graph_id, schema, &properties.sqlite)
    }

    fn graph_id(&self) -> &str {
        &self.graph_id
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.shared.schema)
    }

    fn execute(
        &self,
        chain: &OperationChain,
        context: &Context,
    ) -> Result<OperationOutput, GraphError> {
        self.shared.metrics.record_chain(chain.len());
        self.handlers.execute(chain, context, self, &self.graph_id)
    }

    fn supports(&self, kind: OperationKind) -> bool {
        self.handlers.is_supported(kind)
    }

    fn metrics(&self) -> StoreMetricsSnapshot {
        self.shared.metrics.snapshot()
    }
}

impl ElementBackend for SqliteStore {
    fn insert(&self, elements: Vec<Element>) -> Result<(), GraphError> {
        let schema = &self.shared.schema;
        self.shared.metrics.record_backend_call();
        let mut conn = self.shared.conn.lock();
        let tx = conn.transaction().map_err(sql_err)?;
        for element in elements {
            let encoded = encode_element(schema, &element)?;
            let aggregating = schema.is_aggregating(element.group());
            let key = if aggregating {
                Some(element_key(schema, &element)?)
            } else {
                None
            };

            if let Some(key) = &key {
                let existing: Option<(i64, Vec<u8>)> = tx
                    .query_row(
                        "SELECT id, properties FROM elements WHERE element_key = ?1",
                        params![key],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()
                    .map_err(sql_err)?;
                if let Some((id, stored)) = existing {
                    let stored = decode_properties(schema, element.group(), &stored)?;
                    let merged = schema.aggregate(element.clone().with_properties(stored), &element)?;
                    let properties = encode_properties(schema, merged.group(), merged.properties())?;
                    tx.execute(
                        "UPDATE elements SET properties = ?1 WHERE id = ?2",
                        params![properties, id],
                    )
                    .map_err(sql_err)?;
                    continue;
                }
            }

            let (vertex_a, vertex_b) = physical_order(schema, &encoded);
            tx.execute(
                "INSERT INTO elements (element_key, grp, vertex_a, vertex_b, directed, properties)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    key,
                    encoded.group,
                    vertex_a,
                    vertex_b,
                    encoded.directed,
                    encoded.properties
                ],
            )
            .map_err(sql_err)?;
        }
        tx.commit().map_err(sql_err)
    }

    fn scanner(&self) -> Arc<dyn ElementScan> {
        Arc::new(SqliteScanner {
            shared: Arc::clone(&self.shared),
        })
    }
}

struct SqliteScanner {
    shared: Arc<SqliteShared>,
}

impl SqliteScanner {
    fn cursor(&self, vertex: Option<(PropertyValue, Vec<Vec<u8>>)>) -> ResultStream<Element> {
        ResultStream::new(SqliteCursor {
            shared: Arc::clone(&self.shared),
            vertex,
            last_id: 0,
            page: VecDeque::new(),
            exhausted: false,
            guard: Some(self.shared.metrics.open_cursor()),
        })
    }

    /// Every byte form `vertex` can take as an identifier in this schema.
    fn vertex_keys(&self, vertex: &PropertyValue) -> Result<Vec<Vec<u8>>, GraphError> {
        let schema = &self.shared.schema;
        let type_names: BTreeSet<&str> = schema
            .groups()
            .flat_map(|(_, definition)| definition.identifiers().iter().map(String::as_str))
            .collect();
        let mut keys = BTreeSet::new();
        for type_name in type_names {
            let Some(definition) = schema.type_definition(type_name) else {
                continue;
            };
            if definition.value_kind() == vertex.kind() {
                keys.insert(definition.serialiser().serialise(vertex)?);
            }
        }
        Ok(keys.into_iter().collect())
    }
}

impl ElementScan for SqliteScanner {
    fn scan_all(&self) -> Result<ResultStream<Element>, GraphError> {
        Ok(self.cursor(None))
    }

    fn scan_vertex(&self, vertex: &PropertyValue) -> Result<ResultStream<Element>, GraphError> {
        let keys = self.vertex_keys(vertex)?;
        if keys.is_empty() {
            return Ok(ResultStream::empty());
        }
        Ok(self.cursor(Some((vertex.clone(), keys))))
    }
}

/// Keyset-paginated read; each page is one short query under the connection lock.
struct SqliteCursor {
    shared: Arc<SqliteShared>,
    vertex: Option<(PropertyValue, Vec<Vec<u8>>)>,
    last_id: i64,
    page: VecDeque<Element>,
    exhausted: bool,
    guard: Option<CursorGuard>,
}

impl SqliteCursor {
    fn touches_vertex(&self, element: &Element) -> bool {
        let Some((vertex, _)) = &self.vertex else {
            return true;
        };
        match element {
            Element::Entity(entity) => entity.vertex() == vertex,
            Element::Edge(edge) => edge.source() == vertex || edge.destination() == vertex,
        }
    }

    fn fetch_page(&mut self) -> Result<(), GraphError> {
        let page_size = self.shared.page_size;
        let mut values = vec![Value::Integer(self.last_id), Value::Integer(page_size as i64)];
        let sql = match &self.vertex {
            None => format!("{SELECT_COLUMNS} WHERE id > ?1 ORDER BY id LIMIT ?2"),
            Some((_, keys)) => {
                let placeholders = (0..keys.len())
                    .map(|i| format!("?{}", i + 3))
                    .collect::<Vec<_>>()
                    .join(", ");
                values.extend(keys.iter().cloned().map(Value::Blob));
                format!(
                    "{SELECT_COLUMNS} WHERE id > ?1 AND (vertex_a IN ({placeholders}) OR vertex_b IN ({placeholders})) ORDER BY id LIMIT ?2"
                )
            }
        };

        self.shared.metrics.record_backend_call();
        let schema = Arc::clone(&self.shared.schema);
        let conn = self.shared.conn.lock();
        let mut stmt = conn.prepare_cached(&sql).map_err(sql_err)?;
        let mut rows = stmt.query(params_from_iter(values)).map_err(sql_err)?;
        let mut fetched = 0usize;
        while let Some(row) = rows.next().map_err(sql_err)? {
            fetched += 1;
            let id: i64 = row.get(0).map_err(sql_err)?;
            let group: String = row.get(1).map_err(sql_err)?;
            let vertex_a: Vec<u8> = row.get(2).map_err(sql_err)?;
            let vertex_b: Option<Vec<u8>> = row.get(3).map_err(sql_err)?;
            let directed: bool = row.get(4).map_err(sql_err)?;
            let properties: Vec<u8> = row.get(5).map_err(sql_err)?;
            self.last_id = id;
            let identifiers = match vertex_b {
                Some(vertex_b) => vec![vertex_a, vertex_b],
                None => vec![vertex_a],
            };
            let element = decode_element(
                &schema,
                &EncodedElement {
                    group,
                    identifiers,
                    directed,
                    properties,
                },
            )?;
            self.page.push_back(element);
        }
        if fetched < page_size {
            self.exhausted = true;
        }
        Ok(())
    }
}

impl Cursor<Element> for SqliteCursor {
    fn advance(&mut self) -> Option<Result<Element, GraphError>> {
        loop {
            if let Some(element) = self.page.pop_front() {
                if self.touches_vertex(&element) {
                    return Some(Ok(element));
                }
                continue;
            }
            if self.exhausted {
                return None;
            }
            if let Err(err) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(err));
            }
        }
    }

    fn close(&mut self) {
        self.page.clear();
        self.exhausted = true;
        if self.guard.take().is_some() {
            debug!(last_id = self.last_id, "sqlite cursor closed");
        }
    }
}
