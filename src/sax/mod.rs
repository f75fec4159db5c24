//! SAX (Simple API for XML) Module
//!
//! Callback interface between the push parser and its consumer.
//!
//! ## Architecture
//!
//! ```text
//! chunk ---> StreamingParser ---> ElementHandler (OutlineBuilder, EventCollector, ...)
//! ```
//!
//! The parser owns the handler it was registered with and calls it
//! synchronously, in document order, from inside every `feed`. An empty
//! element tag produces a start event immediately followed by an end event.

pub mod collector;
pub mod events;

pub use collector::{EventCollector, RecordedEvent};
pub use events::StartElement;

use std::io;

/// Receives element events from the push parser
///
/// Implementations hold the parse context (for example the current
/// nesting depth) as their own state.
pub trait ElementHandler {
    /// Called when an element starts
    fn start_element(&mut self, event: &StartElement<'_>);

    /// Called when an element ends
    fn end_element(&mut self, name: &str);

    /// Hand over a failure that could not be reported from inside a callback
    ///
    /// Polled by the driver after every feed.
    fn take_failure(&mut self) -> Option<io::Error> {
        None
    }
}

/// Handler that ignores every event
impl ElementHandler for () {
    fn start_element(&mut self, _event: &StartElement<'_>) {}

    fn end_element(&mut self, _name: &str) {}
}

impl<H: ElementHandler + ?Sized> ElementHandler for &mut H {
    fn start_element(&mut self, event: &StartElement<'_>) {
        (**self).start_element(event)
    }

    fn end_element(&mut self, name: &str) {
        (**self).end_element(name)
    }

    fn take_failure(&mut self) -> Option<io::Error> {
        (**self).take_failure()
    }
}
