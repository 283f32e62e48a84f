//! Source text recorded against parsed documents.

use core::any::Any;
use std::sync::{Arc, Weak};

use hashbrown::HashMap;
use meridian_core::Document;
use parking_lot::Mutex;

struct Entry {
    document: Weak<dyn Any + Send + Sync>,
    source: Arc<str>,
}

/// Identity-keyed, weak map from documents to the source they were parsed from.
///
/// Entries never keep a document alive. Stale entries are pruned whenever a
/// new source is recorded.
#[derive(Default)]
pub(crate) struct DocumentSources {
    entries: Mutex<HashMap<usize, Entry>>,
}

impl DocumentSources {
    pub(crate) fn record(&self, document: &Document, source: Arc<str>) {
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| entry.document.strong_count() > 0);
        entries.insert(
            document.addr(),
            Entry {
                document: document.downgrade(),
                source,
            },
        );
    }

    pub(crate) fn get(&self, document: &Document) -> Option<Arc<str>> {
        let entries = self.entries.lock();
        let entry = entries.get(&document.addr())?;
        (entry.document.strong_count() > 0).then(|| Arc::clone(&entry.source))
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
