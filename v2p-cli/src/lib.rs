//! v2p - venue history to playlist
//!
//! Turns a venue's performance history into a Spotify playlist: search
//! the venue on the registered data sources, pull who played there,
//! filter and deduplicate the records, pick tracks per artist with a
//! selection strategy, and publish the playlist.

pub mod cache;
pub mod filters;
pub mod pipeline;
pub mod services;
pub mod sources;
pub mod strategies;
