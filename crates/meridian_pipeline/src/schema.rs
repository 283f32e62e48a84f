//! The schema holder and its change broadcast.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use meridian_core::Schema;
use parking_lot::RwLock;

use crate::hooks::{SchemaChangeEvent, SchemaChangeHook};
use crate::registry::Indexed;

/// Single-writer holder for the orchestrator's schema.
///
/// Replacement is identity-based: replacing the schema with the handle it
/// already holds is a no-op. Before [`finish_init`](Self::finish_init) a
/// replacement is only recorded; afterwards every schema-change listener
/// except the originating plugin is notified synchronously.
#[derive(Default)]
pub struct SchemaBroadcaster {
    current: RwLock<Option<Schema>>,
    listeners: RwLock<Arc<[Indexed<SchemaChangeHook>]>>,
    ready: AtomicBool,
}

impl SchemaBroadcaster {
    /// Creates a holder, optionally seeded with a schema.
    #[must_use]
    pub fn new(seed: Option<Schema>) -> Self {
        Self {
            current: RwLock::new(seed),
            listeners: RwLock::new(Arc::from(Vec::new())),
            ready: AtomicBool::new(false),
        }
    }

    /// The current schema.
    #[must_use]
    pub fn current(&self) -> Option<Schema> {
        self.current.read().clone()
    }

    /// Returns true once initialization has finished.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Replaces the schema on behalf of the plugin at `origin`.
    ///
    /// Listeners may call back into `replace` while being notified. There is
    /// no cycle detection: two listeners that unconditionally replace the
    /// schema on every notification recurse without end. Each notification
    /// carries the schema current at the time it is delivered.
    pub fn replace(&self, schema: Schema, origin: Option<usize>) {
        {
            let mut current = self.current.write();
            if current.as_ref() == Some(&schema) {
                return;
            }
            *current = Some(schema);
        }

        if !self.is_ready() {
            tracing::debug!(?origin, "schema replaced during init, broadcast deferred");
            return;
        }
        self.broadcast(origin);
    }

    /// Installs the listeners and broadcasts the final schema to all of them.
    pub(crate) fn finish_init(&self, listeners: &[Indexed<SchemaChangeHook>]) {
        *self.listeners.write() = Arc::from(listeners.to_vec());
        self.ready.store(true, Ordering::Release);
        if self.current.read().is_some() {
            self.broadcast(None);
        }
    }

    fn broadcast(&self, origin: Option<usize>) {
        let listeners = Arc::clone(&*self.listeners.read());
        tracing::debug!(?origin, listeners = listeners.len(), "broadcasting schema change");

        for listener in listeners.iter() {
            if Some(listener.plugin) == origin {
                continue;
            }
            let Some(schema) = self.current() else {
                return;
            };
            tracing::trace!(plugin = %listener.name, "notifying schema listener");
            (listener.hook)(&SchemaChangeEvent::new(schema, listener.plugin, self));
        }
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    type Log = Arc<Mutex<Vec<(usize, usize)>>>;

    fn listener(plugin: usize, log: &Log) -> Indexed<SchemaChangeHook> {
        let log = Arc::clone(log);
        Indexed {
            plugin,
            name: Arc::from(format!("listener-{plugin}")),
            hook: Arc::new(move |event: &SchemaChangeEvent<'_>| {
                let value = *event.schema().downcast_ref::<usize>().unwrap_or(&0);
                log.lock().push((plugin, value));
            }),
        }
    }

    #[test]
    fn replacement_before_init_is_deferred() {
        let log: Log = Arc::default();
        let broadcaster = SchemaBroadcaster::new(None);
        broadcaster.replace(Schema::new(1_usize), Some(0));
        broadcaster.replace(Schema::new(2_usize), Some(1));
        assert!(log.lock().is_empty());

        broadcaster.finish_init(&[listener(0, &log), listener(1, &log)]);
        assert_eq!(*log.lock(), [(0, 2), (1, 2)]);
    }

    #[test]
    fn same_schema_is_not_broadcast() {
        let log: Log = Arc::default();
        let schema = Schema::new(7_usize);
        let broadcaster = SchemaBroadcaster::new(Some(schema.clone()));
        broadcaster.finish_init(&[listener(0, &log)]);
        log.lock().clear();

        broadcaster.replace(schema, None);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn origin_is_skipped() {
        let log: Log = Arc::default();
        let broadcaster = SchemaBroadcaster::new(None);
        broadcaster.finish_init(&[listener(0, &log), listener(1, &log), listener(2, &log)]);

        broadcaster.replace(Schema::new(3_usize), Some(1));
        assert_eq!(*log.lock(), [(0, 3), (2, 3)]);
    }

    #[test]
    fn no_broadcast_at_init_without_schema() {
        let log: Log = Arc::default();
        let broadcaster = SchemaBroadcaster::new(None);
        broadcaster.finish_init(&[listener(0, &log)]);
        assert!(broadcaster.is_ready());
        assert!(log.lock().is_empty());
        assert!(broadcaster.current().is_none());
    }
}
