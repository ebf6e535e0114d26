//! In-memory backend.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::{
    config::{MapConfig, StoreProperties},
    context::Context,
    element::{Element, codec::element_key},
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

#[derive(Debug, Default)]
struct MapIndex {
    slots: Vec<Element>,
    by_key: AHashMap<Vec<u8>, usize>,
    by_vertex: AHashMap<PropertyValue, Vec<usize>>,
}

impl MapIndex {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            by_key: AHashMap::with_capacity(capacity),
            by_vertex: AHashMap::with_capacity(capacity),
        }
    }

    fn push(&mut self, element: Element) -> usize {
        let slot = self.slots.len();
        match &element {
            Element::Entity(entity) => {
                self.by_vertex
                    .entry(entity.vertex().clone())
                    .or_default()
                    .push(slot);
            }
            Element::Edge(edge) => {
                self.by_vertex
                    .entry(edge.source().clone())
                    .or_default()
                    .push(slot);
                if edge.destination() != edge.source() {
                    self.by_vertex
                        .entry(edge.destination().clone())
                        .or_default()
                        .push(slot);
                }
            }
        }
        self.slots.push(element);
        slot
    }
}

#[derive(Debug)]
struct MapShared {
    schema: Arc<Schema>,
    index: RwLock<MapIndex>,
    metrics: Arc<StoreMetrics>,
}

/// Stored elements behind one lock; cursors read a slot at a time.
pub struct MapStore {
    graph_id: String,
    shared: Arc<MapShared>,
    handlers: HandlerRegistry<MapStore>,
}

impl std::fmt::Debug for MapStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapStore")
            .field("graph_id", &self.graph_id)
            .field("elements", &self.len())
            .finish()
    }
}

impl MapStore {
    pub fn new(graph_id: impl Into<String>, schema: Schema, config: &MapConfig) -> Self {
        let mut handlers = HandlerRegistry::new();
        handlers::register_defaults(&mut handlers);
        register_element_handlers(&mut handlers);
        Self {
            graph_id: graph_id.into(),
            shared: Arc::new(MapShared {
                schema: Arc::new(schema),
                index: RwLock::new(MapIndex::with_capacity(config.initial_capacity)),
                metrics: Arc::new(StoreMetrics::default()),
            }),
            handlers,
        }
    }

    /// Number of stored elements after aggregation.
    pub fn len(&self) -> usize {
        self.shared.index.read().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for MapStore {
    fn initialise(
        graph_id: &str,
        schema: Schema,
        properties: &StoreProperties,
    ) -> Result<Self, GraphError> {
        Ok(Self::new(graph_id, schema, &properties.map))
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

impl ElementBackend for MapStore {
    fn insert(&self, elements: Vec<Element>) -> Result<(), GraphError> {
        let schema = &self.shared.schema;
        let mut keyed = Vec::with_capacity(elements.len());
        for element in elements {
            let element = match element {
                Element::Edge(edge) => Element::Edge(edge.with_matched_vertex(None)),
                entity => entity,
            };
            let key = if schema.is_aggregating(element.group()) {
                Some(element_key(schema, &element)?)
            } else {
                None
            };
            keyed.push((key, element));
        }

        self.shared.metrics.record_backend_call();
        let mut index = self.shared.index.write();
        // The index is untouched until every aggregation in the batch has succeeded.
        let mut appended: Vec<(Option<Vec<u8>>, Element)> = Vec::new();
        let mut appended_keys: AHashMap<Vec<u8>, usize> = AHashMap::new();
        let mut replaced: AHashMap<usize, Element> = AHashMap::new();
        for (key, element) in keyed {
            let Some(key) = key else {
                appended.push((None, element));
                continue;
            };
            if let Some(&position) = appended_keys.get(&key) {
                let merged = schema.aggregate(appended[position].1.clone(), &element)?;
                appended[position].1 = merged;
            } else if let Some(slot) = index.by_key.get(&key).copied() {
                let current = match replaced.remove(&slot) {
                    Some(current) => current,
                    None => index.slots[slot].clone(),
                };
                replaced.insert(slot, schema.aggregate(current, &element)?);
            } else {
                appended_keys.insert(key.clone(), appended.len());
                appended.push((Some(key), element));
            }
        }

        for (slot, element) in replaced {
            index.slots[slot] = element;
        }
        for (key, element) in appended {
            let slot = index.push(element);
            if let Some(key) = key {
                index.by_key.insert(key, slot);
            }
        }
        Ok(())
    }

    fn scanner(&self) -> Arc<dyn ElementScan> {
        Arc::new(MapScanner {
            shared: Arc::clone(&self.shared),
        })
    }
}

struct MapScanner {
    shared: Arc<MapShared>,
}

impl MapScanner {
    fn cursor(&self, slots: Option<Vec<usize>>) -> ResultStream<Element> {
        self.shared.metrics.record_backend_call();
        ResultStream::new(MapCursor {
            shared: Arc::clone(&self.shared),
            slots,
            position: 0,
            guard: Some(self.shared.metrics.open_cursor()),
        })
    }
}

impl ElementScan for MapScanner {
    fn scan_all(&self) -> Result<ResultStream<Element>, GraphError> {
        Ok(self.cursor(None))
    }

    fn scan_vertex(&self, vertex: &PropertyValue) -> Result<ResultStream<Element>, GraphError> {
        let slots = self
            .shared
            .index
            .read()
            .by_vertex
            .get(vertex)
            .cloned()
            .unwrap_or_default();
        Ok(self.cursor(Some(slots)))
    }
}

/// Walks either every slot or a fixed list of slots, cloning one element per pull.
struct MapCursor {
    shared: Arc<MapShared>,
    slots: Option<Vec<usize>>,
    position: usize,
    guard: Option<CursorGuard>,
}

impl Cursor<Element> for MapCursor {
    fn advance(&mut self) -> Option<Result<Element, GraphError>> {
        let index = self.shared.index.read();
        let slot = match &self.slots {
            Some(slots) => *slots.get(self.position)?,
            None => self.position,
        };
        let element = index.slots.get(slot)?.clone();
        self.position += 1;
        Some(Ok(element))
    }

    fn close(&mut self) {
        if self.guard.take().is_some() {
            debug!(position = self.position, "map cursor closed");
        }
    }
}
