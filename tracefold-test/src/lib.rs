pub mod fixtures;
pub mod invariants;
