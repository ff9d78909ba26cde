//! Functional core for ddbcache.
//!
//! Nothing here talks to a table: the cache contract, the value wire
//! codec, the expiry rules and the lock handle built on top of the contract.

pub mod cache;
pub mod clock;
pub mod lock;
