//! Progress reporting for sort passes.
//!
//! The engine reports through a [`ProgressObserver`]. A pass always emits a
//! range, then values, then a terminal status message. Callers on another
//! thread use [`ChannelObserver`] and poll the receiving end.

use std::sync::mpsc::{self, Receiver, Sender};

/// A single progress notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The progress range changed.
    Range { min: usize, max: usize },
    /// The cumulative number of processed items.
    Value(usize),
    /// Free-text status for display.
    Status(String),
}

/// Receives progress notifications from a sort pass.
pub trait ProgressObserver {
    fn on_event(&mut self, event: ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: FnMut(ProgressEvent),
{
    fn on_event(&mut self, event: ProgressEvent) {
        self(event)
    }
}

/// Forwards events over an mpsc channel.
///
/// A dropped receiver is not an error; later events are discarded.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: Sender<ProgressEvent>,
}

impl ChannelObserver {
    /// Creates an observer and the receiver its events arrive on.
    pub fn new() -> (Self, Receiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_event(&mut self, event: ProgressEvent) {
        let _ = self.sender.send(event);
    }
}

/// Collects every event in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    pub events: Vec<ProgressEvent>,
}

impl ProgressObserver for RecordingObserver {
    fn on_event(&mut self, event: ProgressEvent) {
        self.events.push(event);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {
    fn on_event(&mut self, _event: ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_observer_delivers_in_order() {
        let (mut observer, receiver) = ChannelObserver::new();
        observer.on_event(ProgressEvent::Range { min: 0, max: 2 });
        observer.on_event(ProgressEvent::Value(0));
        drop(observer);

        let events: Vec<_> = receiver.iter().collect();
        assert_eq!(
            events,
            vec![ProgressEvent::Range { min: 0, max: 2 }, ProgressEvent::Value(0)]
        );
    }

    #[test]
    fn test_channel_observer_survives_dropped_receiver() {
        let (mut observer, receiver) = ChannelObserver::new();
        drop(receiver);
        observer.on_event(ProgressEvent::Status("ignored".to_string()));
    }

    #[test]
    fn test_closure_observer() {
        let mut seen = 0;
        {
            let mut observer = |_event: ProgressEvent| seen += 1;
            observer.on_event(ProgressEvent::Value(1));
            observer.on_event(ProgressEvent::Value(2));
        }
        assert_eq!(seen, 2);
    }
}
