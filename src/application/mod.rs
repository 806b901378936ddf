//! Application layer: the channel registry, the dispatch facade on top of it,
//! and manifest-driven startup.
//!
//! The registry is an explicitly constructed value; share it behind an `Arc`
//! with whatever front end drives dispatch.

pub mod bootstrap;
pub mod dispatch;
pub mod registry;
