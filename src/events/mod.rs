//! In-process event broadcasting
//!
//! This module provides:
//! - `EventHub`: multicast point fanning published items out to subscribers
//! - `Subscription`: a subscriber's ordered stream of items
//! - `HubStats`: counters for the health endpoint

mod hub;

pub use hub::{EventHub, HubStats, Subscription, DEFAULT_BUFFER_CAPACITY};
