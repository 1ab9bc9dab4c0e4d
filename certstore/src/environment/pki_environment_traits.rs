//! The pki_environment_traits module features trait definitions and type definitions that are used
//! by [`PkiEnvironment`] to provide functionality that supports building and/or validating X.509
//! certification paths.

use alloc::sync::Arc;
use alloc::vec::Vec;

use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::name::Name;

use crate::util::error::*;
use crate::{
    CertificationPath, CertificationPathResults, CertificationPathSettings, PDVCertificate, PDVCrl,
    PkiEnvironment,
};

/// `ValidatePath` provides a function signature for implementations that perform certification path
/// validation or that provide functionality in support of certification path validation.
pub type ValidatePath = fn(
    &PkiEnvironment,
    &CertificationPathSettings,    // path settings to govern validation
    &mut CertificationPath,        // path to verify
    &mut CertificationPathResults, // path validation results
) -> Result<()>;

/// `CalculateHash` provides a function signature for implementations that perform hashing
pub type CalculateHash = fn(
    &PkiEnvironment,
    &AlgorithmIdentifierOwned, // hash alg
    &[u8],                     // buffer to hash
) -> Result<Vec<u8>>;

/// `VerifySignatureMessage` provides a function signature for implementations that perform signature
/// verification over a message.
pub type VerifySignatureMessage = fn(
    &PkiEnvironment,
    &[u8],                      // message to hash and verify
    &[u8],                      // signature
    &AlgorithmIdentifierOwned,  // signature algorithm
    &SubjectPublicKeyInfoOwned, // public key
) -> Result<()>;

/// The [`CertificateSource`] trait enables trait objects to provide access to trust anchors and CA
/// certificates backed via some means, i.e., an in-memory pool, file-based store, etc.
pub trait CertificateSource {
    /// get_certificates returns a vector with references to all available certificates.
    fn get_certificates(&self) -> Result<Vec<Arc<PDVCertificate>>>;

    /// get_certificates_for_name returns a vector of references to certificates whose subject matches
    /// the presented name, in the order they should be considered as issuer candidates.
    fn get_certificates_for_name(&self, name: &Name) -> Result<Vec<Arc<PDVCertificate>>>;

    /// is_cert_a_trust_anchor returns Ok if the presented certificate is a trust anchor.
    fn is_cert_a_trust_anchor(&self, cert: &PDVCertificate) -> Result<()>;
}

/// The [`CrlSource`] trait defines the interface for retrieving CRLs in support of certification path validation.
pub trait CrlSource {
    /// Retrieves CRLs issued by the named entity
    fn get_crls_for_issuer(&self, issuer: &Name) -> Result<Vec<Arc<PDVCrl>>>;
}
