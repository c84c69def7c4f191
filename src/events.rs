use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};

use anyhow::Result;

use crate::cache::LoadTicket;
use crate::data::model::FeatureCollection;

/// Everything that can change application state. UI widgets and loader
/// threads only ever produce these; [`crate::state::AppState`] consumes them.
#[derive(Debug)]
pub enum Event {
    /// Month slider moved (1–12).
    SetMonth(u8),
    /// Crime-type selector value, e.g. `"all"` or `"drugs"`.
    SelectCrimeType(String),
    ToggleHeatmap(bool),
    /// Index into the collection of cache `generation`, or `None` to close
    /// the details window.
    SelectFeature {
        index: Option<usize>,
        generation: u64,
    },
    ResetView,
    Refresh,
    OpenFile(PathBuf),
    DatasetLoaded {
        ticket: LoadTicket,
        result: Result<FeatureCollection>,
    },
}

/// Single-consumer event queue drained once per frame.
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender for worker threads.
    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn emit(&self, event: Event) {
        // The bus owns the receiver, so the channel cannot be closed here.
        if let Err(e) = self.tx.send(event) {
            log::error!("Dropped event {:?}", e.0);
        }
    }

    /// All queued events in the order they were sent.
    pub fn drain(&self) -> Vec<Event> {
        self.rx.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_in_send_order() {
        let bus = EventBus::new();
        bus.emit(Event::SetMonth(3));
        let worker = bus.sender();
        std::thread::spawn(move || worker.send(Event::Refresh).unwrap())
            .join()
            .unwrap();
        bus.emit(Event::ToggleHeatmap(true));

        let events = bus.drain();
        assert!(matches!(
            events.as_slice(),
            [Event::SetMonth(3), Event::Refresh, Event::ToggleHeatmap(true)]
        ));
        assert!(bus.drain().is_empty());
    }
}
