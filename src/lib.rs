//! connpass-rss - an event feed builder
//!
//! Collects events from the connpass API (group series, pinned events and
//! keyword searches), attaches cover images scraped from each event page,
//! and publishes the merged list as an RSS 2.0 document.

pub mod aggregate;
pub mod config;
pub mod connpass;
pub mod error;
pub mod model;
pub mod params;
pub mod pipeline;
pub mod publish;
pub mod render;
pub mod sources;
pub mod thumbnail;
