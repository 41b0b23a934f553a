//! Viewer-side connection to a running race

mod race;

pub use race::RaceConnection;
