//! SAX Collector
//!
//! Implements ElementHandler to record element events together with the
//! nesting depth at which they fired.

use super::events::StartElement;
use super::ElementHandler;

/// An element event with owned data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedEvent {
    /// `depth` is the number of open elements before this one started
    Start {
        name: String,
        attributes: Vec<(String, String)>,
        depth: usize,
    },
    /// `depth` is the number of open elements after this one ended
    End { name: String, depth: usize },
}

/// Handler that records every element event
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<RecordedEvent>,
    depth: usize,
    max_depth: usize,
}

impl EventCollector {
    /// Create a new collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events in document order
    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// Take the recorded events
    pub fn take_events(&mut self) -> Vec<RecordedEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of currently open elements
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Deepest nesting seen so far
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl ElementHandler for EventCollector {
    fn start_element(&mut self, event: &StartElement<'_>) {
        self.events.push(RecordedEvent::Start {
            name: event.name().to_owned(),
            attributes: event
                .attributes()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
            depth: self.depth,
        });
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
    }

    fn end_element(&mut self, name: &str) {
        debug_assert!(self.depth > 0, "end of <{}> without a matching start", name);
        self.depth = self.depth.saturating_sub(1);
        self.events.push(RecordedEvent::End {
            name: name.to_owned(),
            depth: self.depth,
        });
    }
}
