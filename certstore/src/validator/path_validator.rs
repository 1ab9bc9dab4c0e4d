//! Functions related to certification path validation operations

use alloc::format;

use const_oid::db::rfc5912::ID_CE_SUBJECT_ALT_NAME;
use der::Decode;
use log::info;

use crate::{
    environment::pki_environment::*, path_results::*, path_settings::*, pdv_certificate::*,
    purpose::check_purpose, revocation::crl::check_revocation, util::error::*,
    util::pdv_utilities::*, CertificationPath,
};

//-----------------------------------------------------------------------------
// Top level function for use via PkiEnvironment's validate_path member. This
// aggregates lower level checks.
//-----------------------------------------------------------------------------
/// `validate_path_x509_store` aggregates the checks performed when verifying a certificate via an
/// [`X509Store`](crate::X509Store). It is intended for use in the validate_path field of a [`PkiEnvironment`]
/// structure.
///
/// - The [`PkiEnvironment`] parameter provides callback functions that support certification
/// path validation, for example, signature verification, digest generation and CRL lookup.
/// - The [`CertificationPathSettings`] parameter defines values that govern path validation, i.e., time
/// of interest, purpose and revocation checking flags.
/// - The [`CertificationPath`] parameter provides the chain to validate, beginning with the target.
/// - The [`CertificationPathResults`] parameter is used to collect the validation status, the depth at
/// which an error occurred and CRLs that were consulted.
///
/// Checks are performed in the following order and processing stops at the first failure: signature
/// and validity period of each certificate (interleaved, beginning with the target), critical
/// extensions, basic constraints, purpose and, if requested, revocation status.
pub fn validate_path_x509_store(
    pe: &PkiEnvironment,
    cps: &CertificationPathSettings,
    cp: &mut CertificationPath,
    cpr: &mut CertificationPathResults,
) -> Result<()> {
    check_signatures_and_validity(pe, cps, cp, cpr)?;
    check_critical_extensions(pe, cps, cp, cpr)?;
    check_basic_constraints(pe, cps, cp, cpr)?;
    check_purpose(pe, cps, cp, cpr)?;
    if cps.crl_check() {
        check_revocation(pe, cps, cp, cpr)?;
    }
    cpr.set_validation_status(PathValidationStatus::Ok);
    info!(
        "Successfully completed path validation checks for certificate issued to {}",
        name_to_string(cp.target().subject())
    );
    Ok(())
}

//-----------------------------------------------------------------------------
// Functions that perform some small aspect of path validation
//-----------------------------------------------------------------------------
fn fail(cpr: &mut CertificationPathResults, depth: usize, status: PathValidationStatus) -> Error {
    cpr.set_error_depth(depth as u8);
    cpr.set_validation_status(status);
    Error::PathValidation(status)
}

fn verify_signature_at(
    pe: &PkiEnvironment,
    cp: &CertificationPath,
    cpr: &mut CertificationPathResults,
    i: usize,
) -> Result<()> {
    let cur_cert = &cp.chain[i];
    let issuer = &cp.chain[i + 1];

    let defer_cert = match DeferDecodeSigned::from_der(&cur_cert.encoded_cert) {
        Ok(defer_cert) => defer_cert,
        Err(e) => {
            log_error_for_ca(
                cur_cert,
                format!("failed to parse certificate for signature verification: {}", e).as_str(),
            );
            return Err(fail(cpr, i, PathValidationStatus::CertSignatureFailure));
        }
    };

    let r = pe.verify_signature_message(
        pe,
        &defer_cert.tbs_field,
        cur_cert.decoded_cert.signature.raw_bytes(),
        &cur_cert.decoded_cert.tbs_certificate.signature,
        &issuer.decoded_cert.tbs_certificate.subject_public_key_info,
    );
    if let Err(e) = r {
        log_error_for_ca(
            cur_cert,
            format!("signature verification error: {:?}", e).as_str(),
        );
        let status = match e {
            Error::PathValidation(PathValidationStatus::UnableToDecodeIssuerPublicKey) => {
                PathValidationStatus::UnableToDecodeIssuerPublicKey
            }
            _ => PathValidationStatus::CertSignatureFailure,
        };
        return Err(fail(cpr, i, status));
    }
    Ok(())
}

fn check_validity_at(
    cp: &CertificationPath,
    cpr: &mut CertificationPathResults,
    toi: u64,
    i: usize,
) -> Result<()> {
    match valid_at_time(&cp.chain[i].decoded_cert.tbs_certificate, toi, false) {
        Ok(_) => Ok(()),
        Err(Error::PathValidation(pvs)) => Err(fail(cpr, i, pvs)),
        Err(e) => Err(e),
    }
}

/// `check_signatures_and_validity` walks the path from the target toward the trust anchor. At each
/// position the certificate's signature is verified using the public key of the certificate above it,
/// then its validity period is evaluated against `PS_TIME_OF_INTEREST`. The first failure encountered
/// is reported, so an expired target outranks a bad signature further up the path.
///
/// The trust anchor's signature is not verified and its validity period is only evaluated when
/// `PS_ENFORCE_TRUST_ANCHOR_VALIDITY` is set.
pub fn check_signatures_and_validity(
    pe: &PkiEnvironment,
    cps: &CertificationPathSettings,
    cp: &mut CertificationPath,
    cpr: &mut CertificationPathResults,
) -> Result<()> {
    let toi = cps.get_time_of_interest();
    let enforce_ta_validity = cps.get_enforce_trust_anchor_validity();
    let last = cp.len() - 1;
    for i in 0..cp.len() {
        if i < last {
            verify_signature_at(pe, cp, cpr, i)?;
        } else if !enforce_ta_validity {
            break;
        }
        check_validity_at(cp, cpr, toi, i)?;
    }
    Ok(())
}

/// `verify_signatures` verifies the signature of each certificate in the path using the public key
/// from the next certificate in the path. The signature on the last certificate is not verified.
///
/// An issuer public key that cannot be decoded yields [`PathValidationStatus::UnableToDecodeIssuerPublicKey`].
/// All other failures yield [`PathValidationStatus::CertSignatureFailure`].
pub fn verify_signatures(
    pe: &PkiEnvironment,
    _cps: &CertificationPathSettings,
    cp: &mut CertificationPath,
    cpr: &mut CertificationPathResults,
) -> Result<()> {
    for i in 0..cp.len() - 1 {
        verify_signature_at(pe, cp, cpr, i)?;
    }
    Ok(())
}

/// `check_validity` evaluates each certificate in the path against the `PS_TIME_OF_INTEREST` value read
/// from the [`CertificationPathSettings`] parameter, beginning with the target.
///
/// The last certificate in the path is only evaluated when `PS_ENFORCE_TRUST_ANCHOR_VALIDITY` is set.
pub fn check_validity(
    _pe: &PkiEnvironment,
    cps: &CertificationPathSettings,
    cp: &mut CertificationPath,
    cpr: &mut CertificationPathResults,
) -> Result<()> {
    let toi = cps.get_time_of_interest();
    let enforce_ta_validity = cps.get_enforce_trust_anchor_validity();
    let last = cp.len() - 1;
    for i in 0..cp.len() {
        if i == last && !enforce_ta_validity {
            break;
        }
        check_validity_at(cp, cpr, toi, i)?;
    }
    Ok(())
}

/// `check_critical_extensions` fails with [`PathValidationStatus::UnhandledCriticalExtension`] when any
/// certificate in the path, trust anchor included, marks an extension critical that is not processed
/// during validation. Processed extensions are those in [`EXTS_OF_INTEREST`] plus subjectAltName.
pub fn check_critical_extensions(
    _pe: &PkiEnvironment,
    _cps: &CertificationPathSettings,
    cp: &mut CertificationPath,
    cpr: &mut CertificationPathResults,
) -> Result<()> {
    for (i, cert) in cp.chain.iter().enumerate() {
        if let Some(exts) = &cert.decoded_cert.tbs_certificate.extensions {
            for e in exts {
                if e.critical
                    && !EXTS_OF_INTEREST.contains(&e.extn_id)
                    && e.extn_id != ID_CE_SUBJECT_ALT_NAME
                {
                    log_error_for_ca(
                        cert,
                        format!("unhandled critical extension {}", e.extn_id).as_str(),
                    );
                    return Err(fail(cpr, i, PathValidationStatus::UnhandledCriticalExtension));
                }
            }
        }
    }
    Ok(())
}

/// `check_basic_constraints` ensures all certificates other than the target feature a basicConstraints
/// extension with the cA field set to true.
///
/// Where a CA asserts a pathLenConstraint, the number of non-self-issued intermediate certificates
/// beneath it, excluding the target, may not exceed that value. Violations yield
/// [`PathValidationStatus::PathLengthExceeded`] at the depth of the constraining CA.
pub fn check_basic_constraints(
    _pe: &PkiEnvironment,
    _cps: &CertificationPathSettings,
    cp: &mut CertificationPath,
    cpr: &mut CertificationPathResults,
) -> Result<()> {
    for (i, ca_cert) in cp.chain.iter().enumerate().skip(1) {
        if !is_ca(ca_cert) {
            log_error_for_ca(ca_cert, "missing or invalid basic constraints");
            return Err(fail(cpr, i, PathValidationStatus::InvalidCa));
        }
    }

    // the target and self-issued intermediates do not count against pathLenConstraint
    let mut intermediates = 0;
    for (i, ca_cert) in cp.chain.iter().enumerate().skip(1) {
        if let Some(path_len) = get_path_length_constraint(ca_cert) {
            if intermediates > path_len as usize {
                log_error_for_ca(ca_cert, "path length constraint exceeded");
                return Err(fail(cpr, i, PathValidationStatus::PathLengthExceeded));
            }
        }
        if !is_self_issued(&ca_cert.decoded_cert) {
            intermediates += 1;
        }
    }
    Ok(())
}
