//! Chain building from a target certificate to a trust anchor using the certificates available via a
//! [`PkiEnvironment`] and any extra certificates supplied by the caller.

use alloc::sync::Arc;
use alloc::{format, vec::Vec};

use log::{debug, info};
use x509_cert::ext::pkix::KeyUsages;

use crate::{
    compare_names, get_authority_key_identifier, get_key_usage, get_subject_key_identifier,
    is_self_issued, log_error_for_ca, name_to_string, valid_at_time, CertificationPath,
    CertificationPathResults, CertificationPathSettings, Error, PDVCertificate,
    PathValidationStatus, PkiEnvironment, Result,
};

/// `check_issued` returns true if `candidate` could have issued `child`.
///
/// The candidate's subject must match the child's issuer, the child's authority key identifier must
/// match the candidate's subject key identifier when both are present and the candidate's key usage
/// extension, if present, must assert keyCertSign. No signature verification is performed.
pub fn check_issued(child: &PDVCertificate, candidate: &PDVCertificate) -> bool {
    if !compare_names(child.issuer(), candidate.subject()) {
        return false;
    }

    if let (Some(akid), Some(skid)) = (
        get_authority_key_identifier(child),
        get_subject_key_identifier(candidate),
    ) {
        if akid != skid {
            return false;
        }
    }

    if let Some(ku) = get_key_usage(candidate) {
        if !ku.contains(KeyUsages::KeyCertSign) {
            return false;
        }
    }
    true
}

fn key_ids_match(child: &PDVCertificate, candidate: &PDVCertificate) -> bool {
    matches!(
        (get_authority_key_identifier(child), get_subject_key_identifier(candidate)),
        (Some(akid), Some(skid)) if akid == skid
    )
}

/// `select_issuer` picks among issuer candidates: the first whose key identifiers match the child, else
/// the first valid at the time of interest, else the first.
fn select_issuer(
    child: &PDVCertificate,
    candidates: &[Arc<PDVCertificate>],
    toi: u64,
) -> Option<Arc<PDVCertificate>> {
    candidates
        .iter()
        .find(|c| key_ids_match(child, c))
        .or_else(|| {
            candidates
                .iter()
                .find(|c| valid_at_time(&c.decoded_cert.tbs_certificate, toi, true).is_ok())
        })
        .or_else(|| candidates.first())
        .cloned()
}

/// Returns issuer candidates for `child`, extra certificates first followed by whatever the certificate
/// sources return, minus any certificate already in the path.
fn find_candidates(
    pe: &PkiEnvironment,
    extra_certs: &[Arc<PDVCertificate>],
    cp: &CertificationPath,
    child: &PDVCertificate,
) -> Vec<Arc<PDVCertificate>> {
    let mut candidates: Vec<Arc<PDVCertificate>> = extra_certs
        .iter()
        .filter(|c| compare_names(child.issuer(), c.subject()))
        .cloned()
        .collect();
    if let Ok(certs) = pe.get_certificates_for_name(child.issuer()) {
        candidates.extend(certs);
    }
    candidates.retain(|c| !cp.contains(c) && check_issued(child, c));
    candidates
}

fn fail(cpr: &mut CertificationPathResults, depth: usize, status: PathValidationStatus) -> Error {
    cpr.set_error_depth(depth as u8);
    cpr.set_validation_status(status);
    Error::PathValidation(status)
}

/// `build_chain` extends the [`CertificationPath`], which initially contains only the target, one issuer
/// at a time until a self-issued certificate is reached or no further issuer can be found. The resulting
/// path is accepted only if it terminates at a trust anchor.
///
/// Issuer candidates are drawn from `extra_certs` then from the certificate sources in the
/// [`PkiEnvironment`]. There is no backtracking: once an issuer is selected it is not revisited.
///
/// On failure the error depth and validation status are written to the [`CertificationPathResults`] and
/// the partially built path is left in `cp`. Possible statuses are:
/// - [`PathValidationStatus::ChainTooLong`] when the path would exceed `PS_MAX_CHAIN_LENGTH`
/// - [`PathValidationStatus::DepthZeroSelfSignedCert`] when the target is self-issued but not trusted
/// - [`PathValidationStatus::SelfSignedCertInChain`] when the path ends at an untrusted self-issued certificate
/// - [`PathValidationStatus::UnableToGetIssuerCertLocally`] when no issuer could be found
pub fn build_chain(
    pe: &PkiEnvironment,
    cps: &CertificationPathSettings,
    extra_certs: &[Arc<PDVCertificate>],
    cp: &mut CertificationPath,
    cpr: &mut CertificationPathResults,
) -> Result<()> {
    let toi = cps.get_time_of_interest();
    let max_len = cps.get_max_chain_length() as usize;

    loop {
        let tail = cp.chain[cp.len() - 1].clone();
        if is_self_issued(&tail.decoded_cert) {
            break;
        }

        let candidates = find_candidates(pe, extra_certs, cp, &tail);
        let issuer = match select_issuer(&tail, &candidates, toi) {
            Some(issuer) => issuer,
            None => break,
        };

        if cp.len() >= max_len {
            log_error_for_ca(
                &tail,
                format!("path exceeds maximum length of {}", max_len).as_str(),
            );
            return Err(fail(cpr, cp.len(), PathValidationStatus::ChainTooLong));
        }

        debug!(
            "Selected {} as issuer of {} from {} candidate(s)",
            name_to_string(issuer.subject()),
            name_to_string(tail.subject()),
            candidates.len()
        );
        cp.push(issuer);
    }

    let depth = cp.len() - 1;
    let tail = cp.tail();
    if pe.is_cert_a_trust_anchor(tail).is_ok() {
        info!(
            "Found path of length {} from {} to trust anchor {}",
            cp.len(),
            name_to_string(cp.target().subject()),
            name_to_string(tail.subject())
        );
        return Ok(());
    }

    if is_self_issued(&tail.decoded_cert) {
        log_error_for_ca(tail, "self-issued certificate is not a trust anchor");
        let status = if 0 == depth {
            PathValidationStatus::DepthZeroSelfSignedCert
        } else {
            PathValidationStatus::SelfSignedCertInChain
        };
        Err(fail(cpr, depth, status))
    } else {
        log_error_for_ca(tail, "unable to find issuer certificate");
        Err(fail(
            cpr,
            depth,
            PathValidationStatus::UnableToGetIssuerCertLocally,
        ))
    }
}
