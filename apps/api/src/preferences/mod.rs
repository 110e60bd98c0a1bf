// Preference capture: normalization, the confirmation gate, and the store.
// Every write path builds a `NewPreference`, so normalization cannot be skipped.

pub mod gate;
pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod normalize;
pub mod store;
