mod error;
pub mod expiry;
mod keys;
pub mod serialization;
mod traits;

pub use error::{CacheError, Result};
pub use expiry::{expiration_for, forever_expiration, is_expired};
pub use keys::{prefixed_key, unprefixed_key};
pub use serialization::{decode_value, encode_value, is_numeric, WireValue};
pub use traits::{LockProvider, Store};
