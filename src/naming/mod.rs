// mod.rs - Short stable names for sequences

pub mod assigner;
pub mod base58;

pub use assigner::{NameAssigner, NamePrefix};
