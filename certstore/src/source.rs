//! Sources of trust anchors, certificates and CRLs

pub mod trust_pool;

pub use crate::source::trust_pool::*;
