//! Certification path validation as performed by an X.509 store

pub mod cert_path;
pub mod path_results;
pub mod path_settings;
pub mod path_validator;
pub mod pdv_certificate;
pub mod pdv_extension;
pub mod purpose;

pub use crate::{
    validator::cert_path::*, validator::path_results::*, validator::path_settings::*,
    validator::path_validator::*, validator::pdv_certificate::*, validator::pdv_extension::*,
    validator::purpose::*,
};
