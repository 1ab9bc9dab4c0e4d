//! The trust_pool module provides an in-memory, thread-safe collection of trust anchors, auxiliary
//! CA certificates and CRLs.
//!
//! The following snip illustrates preparation and use of a [`TrustPool`] object.
//!
//! ```
//! use certstore::*;
//!
//! let pool = TrustPool::new();
//!
//! // clones share state, so a clone can be handed to a PkiEnvironment and the original retained
//! // for subsequent additions
//! let mut pe = PkiEnvironment::default();
//! pe.add_certificate_source(Box::new(pool.clone()));
//! pe.add_crl_source(Box::new(pool.clone()));
//! assert_eq!(0, pool.anchor_count().unwrap());
//! ```
//!
//! Insertion never fails due to duplication. Certificates and CRLs are held as `Arc` values and are
//! never modified after insertion.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::error;
use x509_cert::name::Name;

use crate::{
    compare_names, environment::pki_environment_traits::*, name_to_key, util::error::*,
    PDVCertificate, PDVCrl,
};

/// `NameMap` associates a normalized name, as produced by [`name_to_key`], with indices into a vector.
type NameMap = BTreeMap<String, Vec<usize>>;

#[derive(Default)]
struct PoolInner {
    anchors: Vec<Arc<PDVCertificate>>,
    auxiliary: Vec<Arc<PDVCertificate>>,
    crls: Vec<Arc<PDVCrl>>,
    anchor_names: NameMap,
    auxiliary_names: NameMap,
    crl_names: NameMap,
}

fn index_name(map: &mut NameMap, name: &Name, index: usize) {
    map.entry(name_to_key(name)).or_insert_with(Vec::new).push(index);
}

/// Returns items whose name matches `name`, in insertion order. The name map is consulted first and a
/// [`compare_names`] scan is performed when the map yields nothing.
fn lookup<T>(
    items: &[Arc<T>],
    map: &NameMap,
    name: &Name,
    get_name: fn(&T) -> &Name,
) -> Vec<Arc<T>> {
    if let Some(indices) = map.get(&name_to_key(name)) {
        let hits: Vec<Arc<T>> = indices
            .iter()
            .filter_map(|i| items.get(*i))
            .filter(|item| compare_names(get_name(item), name))
            .cloned()
            .collect();
        if !hits.is_empty() {
            return hits;
        }
    }
    items
        .iter()
        .filter(|item| compare_names(get_name(item), name))
        .cloned()
        .collect()
}

fn cert_subject(cert: &PDVCertificate) -> &Name {
    cert.subject()
}

fn crl_issuer(crl: &PDVCrl) -> &Name {
    crl.issuer()
}

/// [`TrustPool`] holds trust anchors, auxiliary (untrusted) CA certificates and CRLs.
///
/// All state is guarded by a single `RwLock` shared among clones. Insertions take the write lock and
/// lookups take the read lock only long enough to clone the relevant `Arc` handles. A poisoned lock
/// yields [`Error::Unrecognized`].
#[derive(Clone, Default)]
pub struct TrustPool {
    inner: Arc<RwLock<PoolInner>>,
}

impl TrustPool {
    /// Creates a new empty [`TrustPool`]
    pub fn new() -> TrustPool {
        TrustPool::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, PoolInner>> {
        match self.inner.read() {
            Ok(g) => Ok(g),
            Err(_e) => {
                error!("trust pool lock is poisoned");
                Err(Error::Unrecognized)
            }
        }
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, PoolInner>> {
        match self.inner.write() {
            Ok(g) => Ok(g),
            Err(_e) => {
                error!("trust pool lock is poisoned");
                Err(Error::Unrecognized)
            }
        }
    }

    /// `add_cert` appends a certificate to the anchors when `trusted` is true or to the auxiliary
    /// certificates otherwise. No uniqueness or cryptographic checks are performed.
    pub fn add_cert(&self, cert: Arc<PDVCertificate>, trusted: bool) -> Result<()> {
        let mut inner = self.write()?;
        let inner = &mut *inner;
        if trusted {
            index_name(&mut inner.anchor_names, cert.subject(), inner.anchors.len());
            inner.anchors.push(cert);
        } else {
            index_name(
                &mut inner.auxiliary_names,
                cert.subject(),
                inner.auxiliary.len(),
            );
            inner.auxiliary.push(cert);
        }
        Ok(())
    }

    /// `add_crl` appends a CRL. No uniqueness or cryptographic checks are performed.
    pub fn add_crl(&self, crl: Arc<PDVCrl>) -> Result<()> {
        let mut inner = self.write()?;
        let inner = &mut *inner;
        index_name(&mut inner.crl_names, crl.issuer(), inner.crls.len());
        inner.crls.push(crl);
        Ok(())
    }

    /// `lookup_issuers` returns every stored certificate whose subject matches `subject`, anchors first
    /// then auxiliary certificates, each in insertion order.
    pub fn lookup_issuers(&self, subject: &Name) -> Result<Vec<Arc<PDVCertificate>>> {
        let inner = self.read()?;
        let mut retval = lookup(&inner.anchors, &inner.anchor_names, subject, cert_subject);
        retval.extend(lookup(
            &inner.auxiliary,
            &inner.auxiliary_names,
            subject,
            cert_subject,
        ));
        Ok(retval)
    }

    /// `lookup_anchors` returns trust anchors whose subject matches `subject`, in insertion order.
    pub fn lookup_anchors(&self, subject: &Name) -> Result<Vec<Arc<PDVCertificate>>> {
        let inner = self.read()?;
        Ok(lookup(
            &inner.anchors,
            &inner.anchor_names,
            subject,
            cert_subject,
        ))
    }

    /// `lookup_auxiliary` returns auxiliary certificates whose subject matches `subject`, in insertion order.
    pub fn lookup_auxiliary(&self, subject: &Name) -> Result<Vec<Arc<PDVCertificate>>> {
        let inner = self.read()?;
        Ok(lookup(
            &inner.auxiliary,
            &inner.auxiliary_names,
            subject,
            cert_subject,
        ))
    }

    /// `lookup_crls` returns every stored CRL whose issuer matches `issuer`, in insertion order.
    pub fn lookup_crls(&self, issuer: &Name) -> Result<Vec<Arc<PDVCrl>>> {
        let inner = self.read()?;
        Ok(lookup(&inner.crls, &inner.crl_names, issuer, crl_issuer))
    }

    /// `is_anchor` returns true if a certificate with the same encoding is among the trust anchors.
    pub fn is_anchor(&self, cert: &PDVCertificate) -> Result<bool> {
        let inner = self.read()?;
        Ok(inner
            .anchors
            .iter()
            .any(|a| a.encoded_cert == cert.encoded_cert))
    }

    /// Returns a snapshot of the trust anchors
    pub fn anchors(&self) -> Result<Vec<Arc<PDVCertificate>>> {
        Ok(self.read()?.anchors.clone())
    }

    /// Returns a snapshot of the auxiliary certificates
    pub fn auxiliary(&self) -> Result<Vec<Arc<PDVCertificate>>> {
        Ok(self.read()?.auxiliary.clone())
    }

    /// Returns a snapshot of the CRLs
    pub fn crls(&self) -> Result<Vec<Arc<PDVCrl>>> {
        Ok(self.read()?.crls.clone())
    }

    /// Returns the number of trust anchors
    pub fn anchor_count(&self) -> Result<usize> {
        Ok(self.read()?.anchors.len())
    }

    /// Returns the number of auxiliary certificates
    pub fn auxiliary_count(&self) -> Result<usize> {
        Ok(self.read()?.auxiliary.len())
    }

    /// Returns the number of CRLs
    pub fn crl_count(&self) -> Result<usize> {
        Ok(self.read()?.crls.len())
    }
}

impl CertificateSource for TrustPool {
    fn get_certificates(&self) -> Result<Vec<Arc<PDVCertificate>>> {
        let inner = self.read()?;
        let mut retval = inner.anchors.clone();
        retval.extend(inner.auxiliary.iter().cloned());
        Ok(retval)
    }

    /// Returns auxiliary certificates then trust anchors whose subject matches `name`, i.e., in the
    /// order issuer candidates are considered when building a chain.
    fn get_certificates_for_name(&self, name: &Name) -> Result<Vec<Arc<PDVCertificate>>> {
        let inner = self.read()?;
        let mut retval = lookup(
            &inner.auxiliary,
            &inner.auxiliary_names,
            name,
            cert_subject,
        );
        retval.extend(lookup(
            &inner.anchors,
            &inner.anchor_names,
            name,
            cert_subject,
        ));
        if retval.is_empty() {
            return Err(Error::NotFound);
        }
        Ok(retval)
    }

    fn is_cert_a_trust_anchor(&self, cert: &PDVCertificate) -> Result<()> {
        if self.is_anchor(cert)? {
            Ok(())
        } else {
            Err(Error::NotFound)
        }
    }
}

impl CrlSource for TrustPool {
    fn get_crls_for_issuer(&self, issuer: &Name) -> Result<Vec<Arc<PDVCrl>>> {
        let crls = self.lookup_crls(issuer)?;
        if crls.is_empty() {
            return Err(Error::NotFound);
        }
        Ok(crls)
    }
}

#[cfg(test)]
fn make_cert(cn: &str, serial: u8) -> Arc<PDVCertificate> {
    let mut params = rcgen::CertificateParams::default();
    params.distinguished_name = rcgen::DistinguishedName::new();
    params
        .distinguished_name
        .push(rcgen::DnType::CommonName, cn);
    params.serial_number = Some(rcgen::SerialNumber::from_slice(&[serial]));
    let kp = rcgen::KeyPair::generate().unwrap();
    let cert = params.self_signed(&kp).unwrap();
    Arc::new(PDVCertificate::try_from(&cert.der()[..]).unwrap())
}

#[test]
fn trust_pool_lookup_order() {
    let pool = TrustPool::new();
    let a1 = make_cert("Shared", 1);
    let x1 = make_cert("Shared", 2);
    let a2 = make_cert("Shared", 3);
    let other = make_cert("Other", 4);

    pool.add_cert(x1.clone(), false).unwrap();
    pool.add_cert(a1.clone(), true).unwrap();
    pool.add_cert(other.clone(), true).unwrap();
    pool.add_cert(a2.clone(), true).unwrap();

    let issuers = pool.lookup_issuers(a1.subject()).unwrap();
    assert_eq!(vec![a1.clone(), a2.clone(), x1.clone()], issuers);

    let candidates = pool.get_certificates_for_name(a1.subject()).unwrap();
    assert_eq!(vec![x1.clone(), a1.clone(), a2.clone()], candidates);

    assert!(pool.is_anchor(&a1).unwrap());
    assert!(!pool.is_anchor(&x1).unwrap());
    assert!(pool.is_cert_a_trust_anchor(&other).is_ok());
    assert_eq!(3, pool.anchor_count().unwrap());
    assert_eq!(1, pool.auxiliary_count().unwrap());
    assert_eq!(vec![x1.clone()], pool.auxiliary().unwrap());
    assert_eq!(vec![a1.clone(), other.clone(), a2.clone()], pool.anchors().unwrap());
    assert_eq!(4, pool.get_certificates().unwrap().len());

    let unknown = make_cert("Nobody", 5);
    assert!(pool.lookup_issuers(unknown.subject()).unwrap().is_empty());
    assert_eq!(
        Some(Error::NotFound),
        pool.get_certificates_for_name(unknown.subject()).err()
    );
}

#[test]
fn trust_pool_duplicates_and_case() {
    use core::str::FromStr;

    let pool = TrustPool::new();
    let c = make_cert("Duplicate Name", 1);
    for _ in 0..3 {
        pool.add_cert(c.clone(), true).unwrap();
    }
    assert_eq!(3, pool.anchor_count().unwrap());
    assert_eq!(3, pool.lookup_issuers(c.subject()).unwrap().len());

    // lookups tolerate case and whitespace differences
    let n = Name::from_str("CN=duplicate   NAME").unwrap();
    assert_eq!(3, pool.lookup_anchors(&n).unwrap().len());
    assert!(pool.lookup_auxiliary(&n).unwrap().is_empty());
    assert!(pool.crls().unwrap().is_empty());
    assert_eq!(
        Some(Error::NotFound),
        pool.get_crls_for_issuer(&n).err()
    );
}
