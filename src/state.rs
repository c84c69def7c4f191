use std::sync::Arc;

use crate::cache::{CacheUpdate, DatasetCache, LoadTicket};
use crate::color::CrimeColors;
use crate::config::Config;
use crate::data::filter::{
    aggregate, visible_indices, CrimeTypeOption, FilterError, FilterExpr, FilterState,
};
use crate::data::loader::DatasetSource;
use crate::data::model::{CrimeCounts, FeatureCollection};
use crate::events::{Event, EventBus};

// ---------------------------------------------------------------------------
// Side effects requested by the reducer
// ---------------------------------------------------------------------------

/// Work the update loop must perform outside the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load a dataset on a worker thread and report back with [`Event::DatasetLoaded`].
    Load(LoadTicket),
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
///
/// Only [`AppState::drain`] mutates it. Derived fields (`expression`,
/// `visible_indices`, `counts`) are rebuilt from scratch from the cached
/// collection and `filters` whenever an event changed either.
pub struct AppState {
    /// Selector entries for the crime-type control.
    pub catalog: Vec<CrimeTypeOption>,

    /// Source loaded at startup and refreshed when nothing else is cached.
    pub default_source: DatasetSource,

    pub cache: DatasetCache,

    pub filters: FilterState,

    /// Heatmap layer visible (point layer hidden) when true.
    pub heatmap: bool,

    /// Layer filter for the current `filters`.
    pub expression: FilterExpr,

    /// Indices of features passing the current filters.
    pub visible_indices: Vec<usize>,

    /// Per-type counts of the visible features, for the chart.
    pub counts: CrimeCounts,

    pub colors: CrimeColors,

    /// Feature shown in the details window.
    pub selected: Option<usize>,

    /// Bumped whenever the map should return to its initial view.
    pub view_epoch: u64,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    dirty: bool,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let filters = config.initial_filter();
        let expression = filters.expression();
        Self {
            catalog: config.crime_types.clone(),
            default_source: config.dataset_source(),
            cache: DatasetCache::new(),
            filters,
            heatmap: false,
            expression,
            visible_indices: Vec::new(),
            counts: CrimeCounts::default(),
            colors: CrimeColors::default(),
            selected: None,
            view_epoch: 0,
            status_message: None,
            dirty: false,
        }
    }

    /// Kick off the startup load.
    pub fn start(&mut self) -> Command {
        Command::Load(self.cache.begin_load(self.default_source.clone()))
    }

    pub fn dataset(&self) -> Option<Arc<FeatureCollection>> {
        self.cache.get()
    }

    pub fn loading(&self) -> bool {
        self.cache.is_loading()
    }

    /// Apply every queued event, then recompute derived state once.
    pub fn drain(&mut self, bus: &EventBus) -> Vec<Command> {
        let commands: Vec<Command> = bus
            .drain()
            .into_iter()
            .filter_map(|event| self.apply(event))
            .collect();
        if self.dirty {
            self.recompute();
        }
        commands
    }

    fn apply(&mut self, event: Event) -> Option<Command> {
        match event {
            Event::SetMonth(month) => {
                self.replace_filters(self.filters.with_month(month));
                None
            }
            Event::SelectCrimeType(selection) => {
                log::debug!("Selected crime type {selection:?}");
                self.replace_filters(self.filters.with_crime_type(&selection, &self.catalog));
                None
            }
            Event::ToggleHeatmap(on) => {
                self.heatmap = on;
                if on {
                    self.selected = None;
                }
                None
            }
            Event::SelectFeature { index, generation } => {
                if index.is_some() && generation != self.cache.generation() {
                    log::debug!("Ignoring click on a replaced dataset (generation {generation})");
                    return None;
                }
                // Visibility must reflect events applied earlier in this drain.
                if self.dirty {
                    self.recompute();
                }
                self.selected = index.filter(|i| !self.heatmap && self.visible_indices.contains(i));
                None
            }
            Event::ResetView => {
                self.view_epoch += 1;
                None
            }
            Event::Refresh => {
                let ticket = self.cache.refresh(&self.default_source);
                log::info!("Refreshing dataset from {}", ticket.source());
                Some(Command::Load(ticket))
            }
            Event::OpenFile(path) => {
                let ticket = self.cache.begin_load(DatasetSource::File(path));
                log::info!("Opening {}", ticket.source());
                Some(Command::Load(ticket))
            }
            Event::DatasetLoaded { ticket, result } => {
                let source = ticket.source().to_string();
                match self.cache.complete(ticket, result) {
                    Ok(CacheUpdate::Stored(count)) => {
                        log::info!("Loaded {count} crimes from {source}");
                        self.on_dataset_replaced();
                    }
                    Ok(CacheUpdate::Stale) => {
                        log::debug!("Discarded superseded load of {source}");
                    }
                    Err(e) => {
                        log::error!("Failed to load {source}: {e:#}");
                        self.status_message = Some(format!("Error: {e:#}"));
                    }
                }
                None
            }
        }
    }

    /// Accept a reduced filter, or log and keep the last valid one.
    fn replace_filters(&mut self, next: Result<FilterState, FilterError>) {
        match next {
            Ok(filters) if filters != self.filters => {
                self.filters = filters;
                self.dirty = true;
            }
            Ok(_) => {}
            Err(e) => log::warn!("Ignoring filter change: {e}"),
        }
    }

    fn on_dataset_replaced(&mut self) {
        self.status_message = None;
        self.selected = None;
        self.view_epoch += 1;

        if let Some(ds) = self.cache.get() {
            // Catalogue labels first so the selectable types keep their colours.
            let mut labels: Vec<String> = self.catalog.iter().map(|o| o.label.clone()).collect();
            for t in ds.crime_types() {
                if !labels.contains(&t) {
                    labels.push(t);
                }
            }
            self.colors = CrimeColors::new(&labels);
        }
        self.dirty = true;
    }

    /// Rebuild expression, visible features and counts from scratch.
    fn recompute(&mut self) {
        self.expression = self.filters.expression();
        match self.cache.get() {
            Some(ds) => {
                self.visible_indices = visible_indices(&ds.features, &self.expression);
                self.counts = aggregate(&ds.features, &self.filters);
            }
            None => {
                self.visible_indices.clear();
                self.counts = CrimeCounts::default();
            }
        }
        if let Some(i) = self.selected {
            if !self.visible_indices.contains(&i) {
                self.selected = None;
            }
        }
        self.dirty = false;
    }
}
