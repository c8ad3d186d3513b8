//! EV charging station finder server.
//!
//! Answers "where can I charge near here?": resolves nearby charging
//! stations from Open Charge Map through a short-lived cache, ranks them by
//! distance, and resolves driving routes to a chosen station.

pub mod cache;
pub mod config;
pub mod directory;
pub mod domain;
pub mod gateway;
pub mod geocode;
pub mod projector;
pub mod routing;
pub mod session;
pub mod tracker;
pub mod weather;
pub mod web;
