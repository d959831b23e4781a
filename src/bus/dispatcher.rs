//! Compile-time event dispatch (§9: "Replace virtual dispatch in the hot
//! loop with a compile-time-parameterised `EventDispatcher<Event>` trait
//! specialization").
//!
//! A [`Bus`](super::Bus) is generic over one concrete dispatcher type `D`
//! per bus instance, so the listener callback for that bus is resolved
//! statically rather than through a vtable. Heterogeneous subscribers (a
//! strategy, a recorder, a risk check, all listening to the same trade
//! bus) are accommodated the way §9 describes: `D` itself can be an enum
//! whose variants wrap the concrete per-participant state, and `dispatch`
//! matches on the variant — still one static call site, no indirection
//! through a trait object.

/// Stamp a bus-assigned sequence number onto an event that carries one of
/// its own (§4.1: "stamp the slot's tick-sequence field if the event
/// carries one"). The default implementation does nothing, for event
/// types with no such field.
pub trait SequenceStamp {
    /// Called once, after construction and before publication.
    fn stamp_sequence(&mut self, _sequence: u64) {}
}

/// The per-bus, compile-time-resolved delivery target.
///
/// `dispatch` must not block indefinitely (§6: "synchronous, must not
/// block indefinitely") and must not panic except to signal a genuine
/// defect — a panic here propagates out of the consumer thread and is not
/// recovered by the bus (§4.1 failure model).
pub trait EventDispatcher<E> {
    /// Deliver one event. `event` is `None` when this call corresponds to
    /// a `try_publish` timeout slot that a *required* consumer still
    /// observes as a placeholder (per the Open Questions resolution in
    /// `spec.md`: optional consumers skip placeholders entirely and never
    /// reach this call for them, since they never had a real event to
    /// report in the first place).
    fn dispatch(&mut self, event: Option<&E>);
}

/// Blanket dispatcher for plain closures, convenient for tests and simple
/// single-purpose consumers.
impl<E, F: FnMut(Option<&E>)> EventDispatcher<E> for F {
    fn dispatch(&mut self, event: Option<&E>) {
        self(event)
    }
}
