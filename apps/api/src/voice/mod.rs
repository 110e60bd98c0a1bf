//! Voice capture: runs a spoken transcript through extraction and the
//! confirmation gate, writing what the gate lets through.

pub mod handlers;
pub mod pipeline;
