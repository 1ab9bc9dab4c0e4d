//! The environment ties together the pluggable pieces used during verification: hash and signature
//! callbacks, the path validation callback and the sources consulted for issuer certificates and CRLs.
//!
//! An [`X509Store`](crate::X509Store) builds one of these internally. Building one by hand looks like:
//! ```
//! use certstore::*;
//!
//! let mut pe = PkiEnvironment::default();
//!
//! // add basic hashing, signature verification and path validation capabilities
//! populate_default_pki_environment(&mut pe);
//!
//! // a TrustPool provides access to trust anchors, CA certificates and CRLs
//! let pool = TrustPool::new();
//! pe.add_certificate_source(Box::new(pool.clone()));
//! pe.add_crl_source(Box::new(pool.clone()));
//! ```
//!
//! Callbacks are tried in the order added until one succeeds.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::{vec, vec::Vec};

use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::name::Name;

use crate::{
    environment::pki_environment_traits::*, util::crypto::*, util::error::*,
    validate_path_x509_store, CertificationPath, CertificationPathResults,
    CertificationPathSettings, PDVCertificate, PDVCrl,
};

/// [`PkiEnvironment`] holds the callbacks and sources used by chain building and path validation.
pub struct PkiEnvironment {
    /// Message digest callbacks
    calculate_hash_callbacks: Vec<CalculateHash>,

    /// Signature verification callbacks
    verify_signature_message_callbacks: Vec<VerifySignatureMessage>,

    /// Path validation callbacks
    validate_path_callbacks: Vec<ValidatePath>,

    /// Sources of trust anchors and CA certificates
    certificate_sources: Vec<Box<dyn CertificateSource + Send + Sync>>,

    /// Sources of CRLs
    crl_sources: Vec<Box<dyn CrlSource + Send + Sync>>,
}

impl Default for PkiEnvironment {
    fn default() -> Self {
        PkiEnvironment::new()
    }
}

impl PkiEnvironment {
    /// Returns an environment with no callbacks or sources
    pub fn new() -> PkiEnvironment {
        PkiEnvironment {
            calculate_hash_callbacks: vec![],
            verify_signature_message_callbacks: vec![],
            validate_path_callbacks: vec![],
            certificate_sources: vec![],
            crl_sources: vec![],
        }
    }

    /// Removes every callback and source, leaving an environment equivalent to [`PkiEnvironment::new`].
    pub fn clear_all_callbacks(&mut self) {
        self.calculate_hash_callbacks.clear();
        self.verify_signature_message_callbacks.clear();
        self.validate_path_callbacks.clear();
        self.certificate_sources.clear();
        self.crl_sources.clear();
    }

    /// add_validate_path_callback adds a [`ValidatePath`] callback to the list used by validate_path.
    pub fn add_validate_path_callback(&mut self, c: ValidatePath) {
        self.validate_path_callbacks.push(c);
    }

    /// clear_validate_path_callbacks clears the list of [`ValidatePath`] callbacks used by validate_path.
    pub fn clear_validate_path_callbacks(&mut self) {
        self.validate_path_callbacks.clear();
    }

    /// validate_path iterates over validate_path_callbacks until an authoritative answer is found
    /// or all options have been exhausted. The error from the last callback is returned on failure.
    pub fn validate_path(
        &self,
        pe: &PkiEnvironment,
        cps: &CertificationPathSettings,
        cp: &mut CertificationPath,
        cpr: &mut CertificationPathResults,
    ) -> Result<()> {
        let mut err = None;
        for f in &self.validate_path_callbacks {
            match f(pe, cps, cp, cpr) {
                Ok(r) => {
                    return Ok(r);
                }
                Err(e) => {
                    err = Some(e);
                }
            }
        }
        if let Some(e) = err {
            return Err(e);
        }
        Err(Error::Unrecognized)
    }

    /// add_calculate_hash_callback adds a [`CalculateHash`] callback to the list used by calculate_hash.
    pub fn add_calculate_hash_callback(&mut self, c: CalculateHash) {
        self.calculate_hash_callbacks.push(c);
    }

    /// calculate_hash iterates over calculate_hash_callbacks until an authoritative answer is found
    /// or all options have been exhausted
    pub fn calculate_hash(
        &self,
        pe: &PkiEnvironment,
        hash_alg: &AlgorithmIdentifierOwned,
        buffer_to_hash: &[u8],
    ) -> Result<Vec<u8>> {
        for f in &self.calculate_hash_callbacks {
            let r = f(pe, hash_alg, buffer_to_hash);
            if let Ok(r) = r {
                return Ok(r);
            }
        }
        Err(Error::Unrecognized)
    }

    /// add_verify_signature_message_callback adds a [`VerifySignatureMessage`] callback to the list used by verify_signature_message.
    pub fn add_verify_signature_message_callback(&mut self, c: VerifySignatureMessage) {
        self.verify_signature_message_callbacks.push(c);
    }

    /// verify_signature_message iterates over verify_signature_message_callbacks until an authoritative answer is found
    /// or all options have been exhausted. The error from the last callback is returned on failure so
    /// that key decoding failures can be distinguished from signature failures.
    pub fn verify_signature_message(
        &self,
        pe: &PkiEnvironment,
        message_to_verify: &[u8],
        signature: &[u8],
        signature_alg: &AlgorithmIdentifierOwned,
        spki: &SubjectPublicKeyInfoOwned,
    ) -> Result<()> {
        let mut err = None;
        for f in &self.verify_signature_message_callbacks {
            match f(pe, message_to_verify, signature, signature_alg, spki) {
                Ok(r) => {
                    return Ok(r);
                }
                Err(e) => {
                    err = Some(e);
                }
            }
        }
        if let Some(e) = err {
            return Err(e);
        }
        Err(Error::Unrecognized)
    }

    /// add_certificate_source adds a [`CertificateSource`] object to the list.
    pub fn add_certificate_source(&mut self, c: Box<dyn CertificateSource + Send + Sync>) {
        self.certificate_sources.push(c);
    }

    /// get_certificates_for_name aggregates issuer candidates for the given name from all certificate sources.
    pub fn get_certificates_for_name(&self, name: &Name) -> Result<Vec<Arc<PDVCertificate>>> {
        let mut retval = vec![];
        for f in &self.certificate_sources {
            if let Ok(certs) = f.get_certificates_for_name(name) {
                retval.extend(certs);
            }
        }
        if !retval.is_empty() {
            return Ok(retval);
        }
        Err(Error::NotFound)
    }

    /// is_cert_a_trust_anchor returns Ok if any certificate source reports the certificate as a trust anchor.
    pub fn is_cert_a_trust_anchor(&self, target: &PDVCertificate) -> Result<()> {
        for f in &self.certificate_sources {
            if f.is_cert_a_trust_anchor(target).is_ok() {
                return Ok(());
            }
        }
        Err(Error::NotFound)
    }

    /// add_crl_source adds a [`CrlSource`] object to the list.
    pub fn add_crl_source(&mut self, c: Box<dyn CrlSource + Send + Sync>) {
        self.crl_sources.push(c);
    }

    /// Retrieves CRLs issued by the named entity from all CRL sources
    pub fn get_crls_for_issuer(&self, issuer: &Name) -> Result<Vec<Arc<PDVCrl>>> {
        let mut retval = vec![];
        for f in &self.crl_sources {
            if let Ok(crls) = f.get_crls_for_issuer(issuer) {
                retval.extend(crls);
            }
        }
        if !retval.is_empty() {
            return Ok(retval);
        }
        Err(Error::NotFound)
    }
}

/// `populate_default_pki_environment` populates a default [`PkiEnvironment`] instance with a default set of callback
/// functions.
///
/// The following callbacks are added:
/// - [`validate_path_x509_store`]
/// - [`calculate_hash_rust_crypto`]
/// - [`verify_signature_message_rust_crypto`]
///
/// Certificate and CRL sources are not added.
pub fn populate_default_pki_environment(pe: &mut PkiEnvironment) {
    pe.add_validate_path_callback(validate_path_x509_store);
    pe.add_calculate_hash_callback(calculate_hash_rust_crypto);
    pe.add_verify_signature_message_callback(verify_signature_message_rust_crypto);
}
