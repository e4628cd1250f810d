pub mod deadline;
pub mod engine;
pub mod input;
pub mod metrics;
pub mod sequencer;
pub mod solver;
pub mod statements;

#[cfg(test)]
pub(crate) mod fixtures;
