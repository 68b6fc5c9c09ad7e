//! Full-dataset snapshot export and import.

mod codec;

pub use codec::*;
