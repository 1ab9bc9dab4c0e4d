#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod builder;
pub mod environment;
pub mod revocation;
pub mod source;
pub mod store;
pub mod util;
pub mod validator;

extern crate alloc;

// order of pub use statements below is intended to assure the list emitted by cargo doc on the main
// index.html page is in alphabetical order.
pub use crate::builder::*;
pub use crate::environment::*;
pub use crate::revocation::*;
pub use crate::{source::*, store::*, util::*, validator::*};
