//! Minilookup - compact postcode range tables
//!
//! This library provides the table codec and lookup shared by the query and build binaries.

pub mod error;
pub mod lookup;

pub use error::{EncodeError, LoadError, TableError};
pub use lookup::{decode, EncodedTable, RangeLookup, TableBuilder};
