//! Stream utilities for viewer subscriptions

mod coalesce;

pub use coalesce::{CoalesceExt, CoalesceUpdates};
