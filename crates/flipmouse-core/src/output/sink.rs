// FlipMouse Output Layer - Sinks
// Destination of passthrough, rewritten and pointer events

use std::io;

use crate::event::RawEvent;

/// Somewhere to write a batch of events.
///
/// Every call is one batch: the sink writes `events` followed by a
/// SYN_REPORT, so callers never append the marker themselves.
pub trait EventSink {
    fn emit(&mut self, events: &[RawEvent]) -> io::Result<()>;
}
