use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use crate::data::loader::DatasetSource;
use crate::data::model::FeatureCollection;

/// Identifies one dataset load. Only the most recent ticket may fill the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    source: DatasetSource,
}

impl LoadTicket {
    pub fn source(&self) -> &DatasetSource {
        &self.source
    }
}

/// What happened to a completed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheUpdate {
    /// The collection replaced the cached one; holds its feature count.
    Stored(usize),
    /// A newer load was started after this one; the result was dropped.
    Stale,
}

/// The one in-memory copy of the feature collection.
///
/// Filled once at startup and replaced only by an explicit refresh or by
/// opening another file. The previous collection stays readable while a
/// load is in flight and survives a failed load.
#[derive(Debug, Default)]
pub struct DatasetCache {
    collection: Option<Arc<FeatureCollection>>,
    source: Option<DatasetSource>,
    loaded_at: Option<Instant>,
    generation: u64,
    pending: Option<u64>,
    /// Generation of the ticket that filled `collection`.
    stored: u64,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a load of `source`, superseding any load still in flight.
    pub fn begin_load(&mut self, source: DatasetSource) -> LoadTicket {
        self.generation += 1;
        self.pending = Some(self.generation);
        LoadTicket {
            generation: self.generation,
            source,
        }
    }

    /// Re-load whatever source the cache currently holds, or `fallback` if empty.
    pub fn refresh(&mut self, fallback: &DatasetSource) -> LoadTicket {
        let source = self.source.clone().unwrap_or_else(|| fallback.clone());
        self.begin_load(source)
    }

    /// Apply the outcome of a load. Errors from the current load are returned;
    /// errors from superseded loads are swallowed as [`CacheUpdate::Stale`].
    pub fn complete(
        &mut self,
        ticket: LoadTicket,
        result: Result<FeatureCollection>,
    ) -> Result<CacheUpdate> {
        if self.pending != Some(ticket.generation) {
            return Ok(CacheUpdate::Stale);
        }
        self.pending = None;

        let collection = result?;
        let count = collection.len();
        self.collection = Some(Arc::new(collection));
        self.source = Some(ticket.source);
        self.stored = ticket.generation;
        self.loaded_at = Some(Instant::now());
        Ok(CacheUpdate::Stored(count))
    }

    pub fn get(&self) -> Option<Arc<FeatureCollection>> {
        self.collection.clone()
    }

    pub fn source(&self) -> Option<&DatasetSource> {
        self.source.as_ref()
    }

    pub fn loaded_at(&self) -> Option<Instant> {
        self.loaded_at
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Changes every time a new collection is stored; 0 while empty.
    /// Feature indices are only meaningful together with this value.
    pub fn generation(&self) -> u64 {
        self.stored
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use anyhow::anyhow;

    use super::*;
    use crate::data::model::Feature;

    fn collection(n: usize) -> FeatureCollection {
        let features = (0..n)
            .map(|i| Feature {
                id: Some(i.to_string()),
                lon: -0.09,
                lat: 51.51,
                crime_type: "Drugs".to_string(),
                month: "2024-03".to_string(),
                location: String::new(),
                outcome: None,
            })
            .collect();
        FeatureCollection::new(features)
    }

    fn file(name: &str) -> DatasetSource {
        DatasetSource::File(PathBuf::from(name))
    }

    #[test]
    fn stores_current_load() {
        let mut cache = DatasetCache::new();
        let ticket = cache.begin_load(file("a.geojson"));
        assert!(cache.is_loading());

        assert_eq!(cache.complete(ticket, Ok(collection(3))).unwrap(), CacheUpdate::Stored(3));
        assert!(!cache.is_loading());
        assert_eq!(cache.get().map(|c| c.len()), Some(3));
        assert_eq!(cache.source(), Some(&file("a.geojson")));
        assert!(cache.loaded_at().is_some());
    }

    #[test]
    fn slow_earlier_load_cannot_overwrite_later_one() {
        let mut cache = DatasetCache::new();
        let first = cache.begin_load(file("old.geojson"));
        let second = cache.begin_load(file("new.geojson"));

        assert_eq!(cache.complete(second, Ok(collection(2))).unwrap(), CacheUpdate::Stored(2));
        assert_eq!(cache.complete(first, Ok(collection(9))).unwrap(), CacheUpdate::Stale);
        assert_eq!(cache.get().map(|c| c.len()), Some(2));
        assert_eq!(cache.source(), Some(&file("new.geojson")));
        assert_eq!(cache.generation(), 2);
    }

    #[test]
    fn failed_load_keeps_previous_collection() {
        let mut cache = DatasetCache::new();
        let ticket = cache.begin_load(file("a.geojson"));
        cache.complete(ticket, Ok(collection(4))).unwrap();

        let retry = cache.refresh(&file("fallback.geojson"));
        assert_eq!(retry.source(), &file("a.geojson"));
        assert!(cache.complete(retry, Err(anyhow!("connection reset"))).is_err());
        assert_eq!(cache.get().map(|c| c.len()), Some(4));
        assert_eq!(cache.generation(), 1);
        assert!(!cache.is_loading());
    }

    #[test]
    fn refresh_of_empty_cache_uses_fallback() {
        let mut cache = DatasetCache::new();
        let ticket = cache.refresh(&file("fallback.geojson"));
        assert_eq!(ticket.source(), &file("fallback.geojson"));
        assert!(cache.get().is_none());
    }
}
