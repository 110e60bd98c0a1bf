//! Scheduled job sync: pulls fractional-executive listings from an Apify
//! actor task into the `jobs` table.

pub mod apify;
pub mod handlers;
pub mod normalize;
pub mod poller;
pub mod sync;
