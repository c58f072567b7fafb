//! Observations recorded by the cleaning rules.

mod observation;

pub use observation::{Evidence, Observation, ObservationType, Severity};
