pub mod job;
pub mod preference;
