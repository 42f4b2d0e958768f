//! Synchronous publish/subscribe between UI controls and the engine.
//!
//! Topics in use:
//! * [`SEARCH_NODE`]: `Payload::Text` with a species name; the engine highlights
//!   the best matching node.
//! * [`UPDATE_LOD`]: `Payload::Scalar` with the new LOD distance threshold.
//!
//! The bus is an ordinary value owned by the application. Subscribers receive a
//! `&mut C` context at publish time instead of capturing shared state, and must
//! be removed with [`EventBus::unsubscribe`] when their owner goes away.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

pub const SEARCH_NODE: &str = "search_node";
pub const UPDATE_LOD: &str = "update_lod";

#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Empty,
    Text(String),
    Scalar(f32),
}

impl Payload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            Self::Scalar(value) => Some(*value),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Callback<C> = Box<dyn FnMut(&mut C, &Payload) -> anyhow::Result<()>>;

#[derive(Clone, Debug, PartialEq)]
pub struct SubscriberFailure {
    pub topic: String,
    pub subscription: SubscriptionId,
    pub message: String,
}

#[derive(Debug, Default, PartialEq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failures: Vec<SubscriberFailure>,
}

impl PublishReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct EventBus<C> {
    topics: HashMap<String, Vec<(SubscriptionId, Callback<C>)>>,
    next_id: u64,
}

impl<C> Default for EventBus<C> {
    fn default() -> Self {
        Self {
            topics: HashMap::new(),
            next_id: 0,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "subscriber panicked".to_owned())
}

impl<C> EventBus<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        topic: impl Into<String>,
        callback: impl FnMut(&mut C, &Payload) -> anyhow::Result<()> + 'static,
    ) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.topics
            .entry(topic.into())
            .or_default()
            .push((id, Box::new(callback)));
        id
    }

    /// Removes a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for subscribers in self.topics.values_mut() {
            if let Some(position) = subscribers.iter().position(|(sub_id, _)| *sub_id == id) {
                drop(subscribers.remove(position));
                return true;
            }
        }
        false
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, Vec::len)
    }

    /// Calls every subscriber of `topic` in subscription order before returning.
    ///
    /// A subscriber that errors or panics is recorded in the report and logged;
    /// the remaining subscribers still run.
    pub fn publish(&mut self, context: &mut C, topic: &str, payload: &Payload) -> PublishReport {
        let mut report = PublishReport::default();
        let Some(subscribers) = self.topics.get_mut(topic) else {
            log::debug!("publish to {topic:?} with no subscribers");
            return report;
        };

        for (id, callback) in subscribers.iter_mut() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(context, payload)));
            let message = match outcome {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    continue;
                }
                Ok(Err(error)) => format!("{error:#}"),
                Err(panic_payload) => panic_message(panic_payload.as_ref()),
            };

            log::warn!("subscriber {id:?} on {topic:?} failed: {message}");
            report.failures.push(SubscriberFailure {
                topic: topic.to_owned(),
                subscription: *id,
                message,
            });
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use anyhow::bail;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn subscribers_run_in_subscription_order() {
        let mut bus = EventBus::<Vec<String>>::new();
        bus.subscribe("topic", |log, _| {
            log.push("first".to_owned());
            Ok(())
        });
        bus.subscribe("topic", |log, payload| {
            log.push(format!("second:{}", payload.as_text().unwrap_or_default()));
            Ok(())
        });

        let mut log = Vec::new();
        let report = bus.publish(&mut log, "topic", &Payload::Text("x".to_owned()));

        assert_eq!(log, vec!["first".to_owned(), "second:x".to_owned()]);
        assert_eq!(report.delivered, 2);
        assert!(report.is_clean());
    }

    #[test]
    fn unknown_topic_has_no_subscribers() {
        let mut bus = EventBus::<u32>::new();
        let mut counter = 0;
        let report = bus.publish(&mut counter, "nobody-listens", &Payload::Empty);
        assert_eq!(report, PublishReport::default());
        assert_eq!(bus.subscriber_count("nobody-listens"), 0);
    }

    #[test]
    fn failing_subscribers_do_not_stop_later_ones() {
        let mut bus = EventBus::<u32>::new();
        let erroring = bus.subscribe("tick", |_, _| bail!("bad input"));
        let panicking = bus.subscribe("tick", |_, _| panic!("boom"));
        bus.subscribe("tick", |count, _| {
            *count += 1;
            Ok(())
        });

        let mut count = 0;
        let report = bus.publish(&mut count, "tick", &Payload::Empty);

        assert_eq!(count, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].subscription, erroring);
        assert_eq!(report.failures[0].message, "bad input");
        assert_eq!(report.failures[1].subscription, panicking);
        assert_eq!(report.failures[1].message, "boom");
    }

    #[test]
    fn unsubscribed_callbacks_are_not_called() {
        let mut bus = EventBus::<u32>::new();
        let id = bus.subscribe("tick", |count, _| {
            *count += 1;
            Ok(())
        });

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));

        let mut count = 0;
        bus.publish(&mut count, "tick", &Payload::Empty);
        assert_eq!(count, 0);
    }
}
