//! Chain building and filesystem helpers for loading certificates and CRLs

pub mod chain_builder;
pub mod file_utils;

pub use crate::builder::{chain_builder::*, file_utils::*};
