//! Trust store facade that combines chain building and path validation

pub mod x509_store;

pub use crate::store::x509_store::*;
