//! Provides structure that represents a certification path including target, optional intermediate CAs
//! and trust anchor.

use alloc::sync::Arc;
use alloc::{vec, vec::Vec};

use crate::PDVCertificate;

/// `CertificationPath` is used to represent the target certificate, intermediate CA certificates and
/// trust anchor that comprise a certification path.
///
/// `chain[0]` is the target. `chain[i + 1]` is the issuer of `chain[i]` and the last element is the
/// certificate at which the path terminates.
#[derive(Clone, Debug)]
#[readonly::make]
pub struct CertificationPath {
    /// `chain` contains the certificates in the path, beginning with the target
    #[readonly]
    pub chain: Vec<Arc<PDVCertificate>>,
}

impl CertificationPath {
    /// instantiates a new CertificationPath containing only the target
    pub fn new(target: Arc<PDVCertificate>) -> CertificationPath {
        CertificationPath {
            chain: vec![target],
        }
    }

    /// returns the target certificate
    pub fn target(&self) -> &PDVCertificate {
        &self.chain[0]
    }

    /// returns the certificate at the end of the path
    pub fn tail(&self) -> &PDVCertificate {
        &self.chain[self.chain.len() - 1]
    }

    /// returns the number of certificates in the path
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// always false, a path contains at least a target
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// appends an issuer to the path
    pub(crate) fn push(&mut self, issuer: Arc<PDVCertificate>) {
        self.chain.push(issuer);
    }

    /// returns true if the path already contains a certificate with the same encoding as `cert`
    pub fn contains(&self, cert: &PDVCertificate) -> bool {
        self.chain.iter().any(|c| c.encoded_cert == cert.encoded_cert)
    }
}
