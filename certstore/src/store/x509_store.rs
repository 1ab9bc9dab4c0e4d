//! The x509_store module provides [`X509Store`], a thread-safe trust store that verifies certificates
//! against a pool of trust anchors and CRLs.
//!
//! ```
//! use certstore::*;
//!
//! let store = X509Store::new();
//! store.set_purpose(Purpose::SslServer);
//! store.set_flags(VerifyFlags::CrlCheck.into());
//!
//! // anchors and CRLs are typically added via add_cert, add_crl or add_file
//! assert_eq!(0, store.pool().anchor_count().unwrap());
//! assert_eq!(PathValidationStatus::Ok, store.error());
//! ```

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::{vec, vec::Vec};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, RwLock};

use flagset::FlagSet;
use log::{debug, error, info, warn};

use crate::{
    build_chain, name_to_string, populate_default_pki_environment,
    read_certs_and_crls_from_file, read_certs_and_crls_from_folder, CertificationPath,
    CertificationPathResults, CertificationPathSettings, CertsAndCrls, Error, PDVCertificate,
    PDVCrl, PathValidationStatus, PkiEnvironment, Purpose, Result, TrustPool, VerifyFlags,
};

/// Name of the environment variable consulted by [`X509Store::set_default_paths`] for a certificate file
pub const SSL_CERT_FILE_ENV: &str = "SSL_CERT_FILE";

/// Name of the environment variable consulted by [`X509Store::set_default_paths`] for a certificate folder
pub const SSL_CERT_DIR_ENV: &str = "SSL_CERT_DIR";

/// Certificate file used by [`X509Store::set_default_paths`] when `SSL_CERT_FILE` is not set
pub const DEFAULT_CERT_FILE: &str = "/etc/ssl/cert.pem";

/// Certificate folder used by [`X509Store::set_default_paths`] when `SSL_CERT_DIR` is not set
pub const DEFAULT_CERT_DIR: &str = "/etc/ssl/certs";

/// `VerificationResult` captures the outcome of a single verification operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VerificationResult {
    /// True if the certificate was successfully verified
    pub valid: bool,
    /// Status of the verification operation
    pub status: PathValidationStatus,
    /// Certificates from the target to the trust anchor. On failure, contains the partial chain.
    pub chain: Vec<Arc<PDVCertificate>>,
    /// Index of the certificate in `chain` at which an error occurred, counting from the target
    pub error_depth: usize,
}

impl Default for VerificationResult {
    fn default() -> Self {
        VerificationResult {
            valid: false,
            status: PathValidationStatus::Ok,
            chain: vec![],
            error_depth: 0,
        }
    }
}

impl VerificationResult {
    /// Returns the OpenSSL-compatible numeric value for the status
    pub fn error_code(&self) -> i32 {
        self.status.code()
    }

    /// Returns the error string for the status
    pub fn error_string(&self) -> String {
        self.status.to_string()
    }
}

/// `VerifyCallback` is invoked at the end of each verification operation with the preliminary outcome and
/// the result. The returned value becomes the outcome of the operation.
pub type VerifyCallback = fn(bool, &VerificationResult) -> bool;

/// `X509Store` aggregates a [`TrustPool`], a set of [`CertificationPathSettings`] and a [`PkiEnvironment`] and
/// verifies certificates by building a chain to a trust anchor then validating that chain.
///
/// `X509Store` is `Send + Sync` and all operations take `&self`. Settings changes apply to subsequent
/// verification operations. The accessors that report on the last result ([`X509Store::error`],
/// [`X509Store::chain`], etc.) reflect whichever verification completed most recently, so when a store
/// is shared across threads the [`VerificationResult`] returned by [`X509Store::verify_with_result`]
/// should be used instead.
pub struct X509Store {
    pe: PkiEnvironment,
    pool: TrustPool,
    settings: RwLock<CertificationPathSettings>,
    verify_callback: RwLock<Option<VerifyCallback>>,
    last_result: Mutex<VerificationResult>,
}

impl Default for X509Store {
    fn default() -> Self {
        X509Store::new()
    }
}

impl X509Store {
    /// Creates an empty store with default settings
    pub fn new() -> X509Store {
        let pool = TrustPool::new();
        let mut pe = PkiEnvironment::new();
        populate_default_pki_environment(&mut pe);
        pe.add_certificate_source(Box::new(pool.clone()));
        pe.add_crl_source(Box::new(pool.clone()));
        X509Store {
            pe,
            pool,
            settings: RwLock::new(CertificationPathSettings::new()),
            verify_callback: RwLock::new(None),
            last_result: Mutex::new(VerificationResult::default()),
        }
    }

    /// Returns the [`TrustPool`] used by the store
    pub fn pool(&self) -> &TrustPool {
        &self.pool
    }

    /// `add_cert` adds a certificate to the store as a trust anchor. Duplicates are not rejected.
    pub fn add_cert(&self, cert: &PDVCertificate) -> &Self {
        if let Err(e) = self.pool.add_cert(Arc::new(cert.clone()), true) {
            error!(
                "Failed to add certificate issued to {}: {:?}",
                name_to_string(cert.subject()),
                e
            );
        }
        self
    }

    /// `add_crl` adds a CRL to the store. Duplicates are not rejected.
    pub fn add_crl(&self, crl: &PDVCrl) -> &Self {
        if let Err(e) = self.pool.add_crl(Arc::new(crl.clone())) {
            error!(
                "Failed to add CRL issued by {}: {:?}",
                name_to_string(crl.issuer()),
                e
            );
        }
        self
    }

    fn add_items(&self, items: CertsAndCrls) -> Result<usize> {
        let count = items.len();
        for cert in items.certs {
            self.pool.add_cert(Arc::new(cert), true)?;
        }
        for crl in items.crls {
            self.pool.add_crl(Arc::new(crl))?;
        }
        Ok(count)
    }

    /// `add_file` reads a PEM file containing one or more blocks or a DER file. Each certificate is added
    /// as a trust anchor and each CRL is added as a CRL. Returns the number of items added.
    pub fn add_file(&self, path: &Path) -> Result<usize> {
        let items = read_certs_and_crls_from_file(path)?;
        let count = self.add_items(items)?;
        debug!("Added {} item(s) from {}", count, path.display());
        Ok(count)
    }

    /// `set_default_paths` loads trust anchors from the file named by `SSL_CERT_FILE` (or
    /// [`DEFAULT_CERT_FILE`]) and from the files in the folder named by `SSL_CERT_DIR` (or
    /// [`DEFAULT_CERT_DIR`]). Failures are logged and otherwise ignored. Returns the number of items added.
    pub fn set_default_paths(&self) -> usize {
        let file = env::var_os(SSL_CERT_FILE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CERT_FILE));
        let dir = env::var_os(SSL_CERT_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CERT_DIR));

        let mut count = 0;
        match self.add_file(&file) {
            Ok(c) => count += c,
            Err(e) => warn!(
                "Failed to load default certificate file {}: {}",
                file.display(),
                e
            ),
        }

        match read_certs_and_crls_from_folder(&dir).and_then(|items| self.add_items(items)) {
            Ok(c) => count += c,
            Err(e) => warn!(
                "Failed to load default certificate folder {}: {}",
                dir.display(),
                e
            ),
        }
        info!("Loaded {} item(s) from default paths", count);
        count
    }

    /// Returns a snapshot of the current settings
    pub fn settings(&self) -> CertificationPathSettings {
        match self.settings.read() {
            Ok(g) => g.clone(),
            Err(p) => p.into_inner().clone(),
        }
    }

    /// Replaces the current settings
    pub fn set_settings(&self, cps: CertificationPathSettings) {
        self.update_settings(|s| *s = cps);
    }

    fn update_settings<F: FnOnce(&mut CertificationPathSettings)>(&self, f: F) {
        match self.settings.write() {
            Ok(mut g) => f(&mut g),
            Err(p) => f(&mut p.into_inner()),
        }
    }

    /// Sets the purpose checked against the target certificate
    pub fn set_purpose(&self, purpose: Purpose) {
        self.update_settings(|s| s.set_purpose(purpose));
    }

    /// Sets the verification flags
    pub fn set_flags(&self, flags: FlagSet<VerifyFlags>) {
        self.update_settings(|s| s.set_verify_flags_from_set(flags));
    }

    /// Sets the time of interest as seconds since the Unix epoch. `None` restores use of the current time.
    pub fn set_time(&self, toi: Option<u64>) {
        self.update_settings(|s| match toi {
            Some(t) => s.set_time_of_interest(t),
            None => s.clear_time_of_interest(),
        });
    }

    /// Sets the maximum number of certificates in a chain
    pub fn set_depth(&self, depth: u8) {
        self.update_settings(|s| s.set_max_chain_length(depth));
    }

    /// Installs or removes the callback invoked at the end of each verification operation
    pub fn set_verify_callback(&self, cb: Option<VerifyCallback>) {
        match self.verify_callback.write() {
            Ok(mut g) => *g = cb,
            Err(p) => *p.into_inner() = cb,
        }
    }

    fn get_verify_callback(&self) -> Option<VerifyCallback> {
        match self.verify_callback.read() {
            Ok(g) => *g,
            Err(p) => *p.into_inner(),
        }
    }

    fn last(&self) -> MutexGuard<'_, VerificationResult> {
        match self.last_result.lock() {
            Ok(g) => g,
            Err(p) => p.into_inner(),
        }
    }

    /// `verify` returns true if a chain from `cert` to a trust anchor could be built and validated. The
    /// `extra_certs` are considered as intermediate CA certificates for this operation only.
    pub fn verify(&self, cert: &PDVCertificate, extra_certs: &[PDVCertificate]) -> bool {
        self.verify_with_result(cert, extra_certs).valid
    }

    /// `verify_encoded` parses a DER-encoded certificate then verifies it as described for [`X509Store::verify`].
    /// An error is returned if the buffer does not contain a certificate.
    pub fn verify_encoded(&self, encoded: &[u8], extra_certs: &[PDVCertificate]) -> Result<bool> {
        let cert = PDVCertificate::try_from(encoded).map_err(Error::Asn1Error)?;
        Ok(self.verify(&cert, extra_certs))
    }

    /// `verify_with_result` verifies a certificate and returns the full result, which is also saved as the
    /// store's last result.
    pub fn verify_with_result(
        &self,
        cert: &PDVCertificate,
        extra_certs: &[PDVCertificate],
    ) -> VerificationResult {
        let mut cps = self.settings();
        let toi = cps.get_time_of_interest();
        cps.set_time_of_interest(toi);

        let extra: Vec<Arc<PDVCertificate>> =
            extra_certs.iter().map(|c| Arc::new(c.clone())).collect();
        let mut cp = CertificationPath::new(Arc::new(cert.clone()));
        let mut cpr = CertificationPathResults::new();

        let r = build_chain(&self.pe, &cps, &extra, &mut cp, &mut cpr)
            .and_then(|_| self.pe.validate_path(&self.pe, &cps, &mut cp, &mut cpr));

        let status = match r {
            Ok(()) => PathValidationStatus::Ok,
            Err(Error::PathValidation(pvs)) => pvs,
            Err(e) => {
                error!(
                    "Verification of certificate issued to {} failed with {:?}",
                    name_to_string(cert.subject()),
                    e
                );
                cpr.get_validation_status()
                    .unwrap_or(PathValidationStatus::Unspecified)
            }
        };

        let mut result = VerificationResult {
            valid: PathValidationStatus::Ok == status,
            status,
            chain: cp.chain.clone(),
            error_depth: cpr.get_error_depth() as usize,
        };

        if let Some(cb) = self.get_verify_callback() {
            let ok = cb(result.valid, &result);
            if ok && !result.valid {
                info!(
                    "Verify callback accepted certificate issued to {} despite {}",
                    name_to_string(cert.subject()),
                    result.status
                );
                result.valid = true;
                result.status = PathValidationStatus::Ok;
                result.error_depth = 0;
            } else if !ok && result.valid {
                result.valid = false;
                result.status = PathValidationStatus::Unspecified;
            }
        }

        *self.last() = result.clone();
        result
    }

    /// Returns the status of the last verification operation
    pub fn error(&self) -> PathValidationStatus {
        self.last().status
    }

    /// Returns the numeric code for the status of the last verification operation
    pub fn error_code(&self) -> i32 {
        self.last().error_code()
    }

    /// Returns the error string for the status of the last verification operation
    pub fn error_string(&self) -> String {
        self.last().error_string()
    }

    /// Returns the chain from the last verification operation
    pub fn chain(&self) -> Vec<Arc<PDVCertificate>> {
        self.last().chain.clone()
    }

    /// Returns the error depth from the last verification operation
    pub fn error_depth(&self) -> usize {
        self.last().error_depth
    }
}
