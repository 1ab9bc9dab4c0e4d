//! Revocation status determination using CRLs
//!
//! Revocation checking is performed as the final step of [`validate_path_x509_store`](crate::validate_path_x509_store)
//! when `CrlCheck` is set in the verify flags. CRLs are obtained via the [`CrlSource`](crate::CrlSource)
//! objects registered with a [`PkiEnvironment`](crate::PkiEnvironment). Delta CRLs, indirect CRLs and
//! OCSP are not supported.

pub mod crl;

pub use crate::revocation::crl::*;
