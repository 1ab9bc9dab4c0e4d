//! Structures and functions to perform CRL processing (minus support for delta CRLs, indirect CRLs,
//! distribution point scoping and on hold). CRLs that mark any of those features critical are rejected.

use alloc::sync::Arc;
use alloc::{
    format,
    string::{String, ToString},
    vec::Vec,
};

use const_oid::db::rfc5912::{ID_CE_AUTHORITY_KEY_IDENTIFIER, ID_CE_CRL_NUMBER};
use der::{Decode, Encode};
use log::{debug, error, info};
use x509_cert::crl::CertificateList;
use x509_cert::ext::pkix::KeyUsages;
use x509_cert::name::Name;

use crate::{
    get_key_usage, is_self_issued, log_error_for_ca, name_to_string, Asn1Metadata,
    Asn1MetadataTypes, CertificationPath, CertificationPathResults, CertificationPathSettings,
    DeferDecodeSigned, Error, PDVCertificate, PathValidationStatus, PkiEnvironment, Result,
    MD_LOCATOR,
};

/// [`PDVCrl`] is used to aggregate a binary, DER-encoded CertificateList, a parsed CertificateList and
/// optional metadata in support of revocation status determination.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct PDVCrl {
    /// Binary, encoded CertificateList object
    pub encoded_crl: Vec<u8>,
    /// Decoded CertificateList object
    pub decoded_crl: CertificateList,
    /// Optional metadata about the CRL
    pub metadata: Option<Asn1Metadata>,
}

impl TryFrom<&[u8]> for PDVCrl {
    type Error = der::Error;

    fn try_from(enc_crl: &[u8]) -> der::Result<Self> {
        let crl = CertificateList::from_der(enc_crl)?;
        Ok(PDVCrl {
            encoded_crl: enc_crl.to_vec(),
            decoded_crl: crl,
            metadata: None,
        })
    }
}

impl TryFrom<CertificateList> for PDVCrl {
    type Error = der::Error;

    fn try_from(crl: CertificateList) -> der::Result<Self> {
        Ok(PDVCrl {
            encoded_crl: crl.to_der()?,
            decoded_crl: crl,
            metadata: None,
        })
    }
}

impl PDVCrl {
    /// Returns the issuer name from the CRL.
    pub fn issuer(&self) -> &Name {
        &self.decoded_crl.tbs_cert_list.issuer
    }

    /// Returns the thisUpdate value as seconds since the Unix epoch.
    pub fn this_update(&self) -> u64 {
        self.decoded_crl
            .tbs_cert_list
            .this_update
            .to_unix_duration()
            .as_secs()
    }

    /// Returns the nextUpdate value as seconds since the Unix epoch, if present.
    pub fn next_update(&self) -> Option<u64> {
        self.decoded_crl
            .tbs_cert_list
            .next_update
            .map(|nu| nu.to_unix_duration().as_secs())
    }

    /// Returns true if the CRL lists the certificate's serial number.
    pub fn is_revoked(&self, cert: &PDVCertificate) -> bool {
        match &self.decoded_crl.tbs_cert_list.revoked_certificates {
            Some(revoked) => revoked
                .iter()
                .any(|rc| rc.serial_number == *cert.serial_number()),
            None => false,
        }
    }
}

/// `parse_crl` takes a buffer containing a binary DER encoded CRL and returns a [`PDVCrl`] if parsing
/// was successful. The `filename` is saved as the [`MD_LOCATOR`] metadata value.
pub fn parse_crl(buffer: &[u8], filename: &str) -> Result<PDVCrl> {
    match PDVCrl::try_from(buffer) {
        Ok(mut crl) => {
            let mut md = Asn1Metadata::new();
            md.insert(
                MD_LOCATOR.to_string(),
                Asn1MetadataTypes::String(filename.to_string()),
            );
            crl.metadata = Some(md);
            Ok(crl)
        }
        Err(e) => {
            error!("Failed to parse CRL from {}: {}", filename, e);
            Err(Error::Asn1Error(e))
        }
    }
}

fn crl_issuer_string(crl: &PDVCrl) -> String {
    name_to_string(crl.issuer())
}

/// `verify_crl` verifies the signature on the CRL using the public key from the issuer certificate.
pub fn verify_crl(pe: &PkiEnvironment, crl: &PDVCrl, issuer_cert: &PDVCertificate) -> Result<()> {
    let defer_crl = match DeferDecodeSigned::from_der(&crl.encoded_crl) {
        Ok(crl) => crl,
        Err(_e) => {
            return Err(Error::PathValidation(
                PathValidationStatus::CrlSignatureFailure,
            ))
        }
    };

    let r = pe.verify_signature_message(
        pe,
        &defer_crl.tbs_field,
        defer_crl.signature.raw_bytes(),
        &defer_crl.signature_algorithm,
        &issuer_cert.decoded_cert.tbs_certificate.subject_public_key_info,
    );
    if let Err(e) = r {
        log_error_for_ca(
            issuer_cert,
            format!("CRL signature verification error: {:?}", e).as_str(),
        );
        return match e {
            Error::PathValidation(PathValidationStatus::UnableToDecodeIssuerPublicKey) => Err(
                Error::PathValidation(PathValidationStatus::UnableToDecodeIssuerPublicKey),
            ),
            _ => Err(Error::PathValidation(
                PathValidationStatus::CrlSignatureFailure,
            )),
        };
    }
    Ok(())
}

/// `check_crl_sign` returns an error if the issuer certificate features a key usage extension that
/// does not assert cRLSign.
pub fn check_crl_sign(issuer_cert: &PDVCertificate) -> Result<()> {
    if let Some(ku) = get_key_usage(issuer_cert) {
        if !ku.contains(KeyUsages::CRLSign) {
            log_error_for_ca(issuer_cert, "crlSign is not set in key usage extension");
            return Err(Error::PathValidation(
                PathValidationStatus::KeyUsageNoCrlSign,
            ));
        }
    }
    Ok(())
}

/// `check_crl_validity` evaluates the thisUpdate and nextUpdate fields of the CRL relative to the time of
/// interest.
pub fn check_crl_validity(toi: u64, crl: &PDVCrl) -> Result<()> {
    let tu = crl.this_update();
    if tu > toi {
        info!(
            "CRL from {} has this update time ({}) later than time of interest ({})",
            crl_issuer_string(crl),
            tu,
            toi
        );
        return Err(Error::PathValidation(PathValidationStatus::CrlNotYetValid));
    }
    if let Some(nu) = crl.next_update() {
        if nu < toi {
            info!(
                "CRL from {} has next update time ({}) earlier than time of interest ({})",
                crl_issuer_string(crl),
                nu,
                toi
            );
            return Err(Error::PathValidation(PathValidationStatus::CrlHasExpired));
        }
    }
    Ok(())
}

/// `check_crl_extensions` returns an error if the CRL features a critical extension other than cRLNumber
/// or authorityKeyIdentifier. A critical issuingDistributionPoint or deltaCRLIndicator yields
/// [`PathValidationStatus::UnhandledCriticalCrlExtension`] since partitioned and delta CRLs are not processed.
pub fn check_crl_extensions(crl: &PDVCrl) -> Result<()> {
    let handled = [ID_CE_CRL_NUMBER, ID_CE_AUTHORITY_KEY_IDENTIFIER];
    if let Some(exts) = &crl.decoded_crl.tbs_cert_list.crl_extensions {
        for e in exts {
            if e.critical && !handled.contains(&e.extn_id) {
                info!(
                    "CRL from {} features unrecognized critical extension {}",
                    crl_issuer_string(crl),
                    e.extn_id
                );
                return Err(Error::PathValidation(
                    PathValidationStatus::UnhandledCriticalCrlExtension,
                ));
            }
        }
    }
    Ok(())
}

/// `select_crl` returns the first CRL that is current at the time of interest or, if none is current,
/// the last CRL in the list.
pub fn select_crl(crls: &[Arc<PDVCrl>], toi: u64) -> Option<Arc<PDVCrl>> {
    crls.iter()
        .find(|crl| check_crl_validity(toi, crl).is_ok())
        .or_else(|| crls.last())
        .cloned()
}

/// `process_crl` evaluates a CRL relative to a given target certificate and issuer certificate.
///
/// The issuer's key usage, CRL signature, CRL validity period and CRL extensions are checked before the
/// target's serial number is sought among the revoked entries.
pub fn process_crl(
    pe: &PkiEnvironment,
    toi: u64,
    target_cert: &PDVCertificate,
    issuer_cert: &PDVCertificate,
    crl: &PDVCrl,
) -> Result<()> {
    check_crl_sign(issuer_cert)?;
    verify_crl(pe, crl, issuer_cert)?;
    check_crl_validity(toi, crl)?;
    check_crl_extensions(crl)?;

    if crl.is_revoked(target_cert) {
        log_error_for_ca(target_cert, "certificate is revoked");
        return Err(Error::PathValidation(PathValidationStatus::CertRevoked));
    }
    Ok(())
}

/// `check_revocation` determines the revocation status of the target certificate or, when `CrlCheckAll`
/// is set, of every certificate in the path, using CRLs available via the [`PkiEnvironment`].
///
/// A certificate for which no CRL is available is not treated as an error. CRLs that were consulted are
/// recorded via `PR_CRLS_CONSULTED`.
pub fn check_revocation(
    pe: &PkiEnvironment,
    cps: &CertificationPathSettings,
    cp: &mut CertificationPath,
    cpr: &mut CertificationPathResults,
) -> Result<()> {
    let toi = cps.get_time_of_interest();
    let count = if cps.crl_check_all() { cp.len() } else { 1 };

    for i in 0..count {
        let cur_cert = &cp.chain[i];
        let crls = match pe.get_crls_for_issuer(cur_cert.issuer()) {
            Ok(crls) => crls,
            Err(_) => {
                debug!(
                    "No CRLs available for certificate issued to {}",
                    name_to_string(cur_cert.subject())
                );
                continue;
            }
        };

        let issuer_cert = if i + 1 < cp.len() {
            &cp.chain[i + 1]
        } else if is_self_issued(&cur_cert.decoded_cert) {
            cur_cert
        } else {
            log_error_for_ca(cur_cert, "unable to determine CRL issuer");
            cpr.set_error_depth(i as u8);
            cpr.set_validation_status(PathValidationStatus::UnableToGetCrlIssuer);
            return Err(Error::PathValidation(
                PathValidationStatus::UnableToGetCrlIssuer,
            ));
        };

        let crl = match select_crl(&crls, toi) {
            Some(crl) => crl,
            None => continue,
        };
        cpr.add_crl_consulted(&crl.encoded_crl);

        if let Err(e) = process_crl(pe, toi, cur_cert, issuer_cert, &crl) {
            if let Error::PathValidation(pvs) = e {
                cpr.set_error_depth(i as u8);
                cpr.set_validation_status(pvs);
            }
            return Err(e);
        }
    }
    Ok(())
}
