//! Postcode range lookup.
//!
//! A precomputed table maps ascending base-36 postcode keys to values. The
//! table travels in a compact wire form (delta keys, sentinel value indices)
//! and is decoded once into an immutable [`RangeLookup`] that answers point
//! queries by binary search.

mod builder;
pub mod codec;
mod loader;
pub mod postcode;
mod table;

pub use builder::TableBuilder;
pub use loader::{load_from_path, load_from_reader, load_from_url, TableSource};
pub use table::{decode, EncodedTable, RangeLookup};
