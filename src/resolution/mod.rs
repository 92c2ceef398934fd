//! Entity resolution for extracted claims.

mod fuzzy;
mod resolver;
mod temporal;

pub use fuzzy::{closest_match, sequence_ratio};
pub use resolver::{Binding, EntityResolver};
pub use temporal::{bind_temporal, month_key};
