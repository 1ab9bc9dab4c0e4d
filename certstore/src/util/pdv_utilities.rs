//! Utility functions used when building and validating certification paths

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use const_oid::db::rfc5912::{
    ECDSA_WITH_SHA_224, ECDSA_WITH_SHA_256, ECDSA_WITH_SHA_384, ECDSA_WITH_SHA_512,
    ID_CE_AUTHORITY_KEY_IDENTIFIER, ID_CE_BASIC_CONSTRAINTS, ID_CE_KEY_USAGE,
    ID_CE_SUBJECT_KEY_IDENTIFIER, ID_SHA_224, ID_SHA_256, ID_SHA_384, ID_SHA_512,
    SHA_224_WITH_RSA_ENCRYPTION, SHA_256_WITH_RSA_ENCRYPTION, SHA_384_WITH_RSA_ENCRYPTION,
    SHA_512_WITH_RSA_ENCRYPTION,
};
use der::asn1::{Ia5String, ObjectIdentifier, PrintableString, Utf8StringRef};
use der::{Encode, Tagged};
use flagset::FlagSet;
use lazy_static::lazy_static;
use log::error;
use regex::Regex;
use spki::AlgorithmIdentifierOwned;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::certificate::TbsCertificate;
use x509_cert::ext::pkix::KeyUsages;
use x509_cert::name::Name;
use x509_cert::Certificate;

use crate::{pdv_certificate::*, pdv_extension::*, util::error::*};

lazy_static! {
    static ref WHITESPACE: Option<Regex> = Regex::new(r"\s+").ok();
}

/// `is_self_issued` returns true if the subject field in the certificate is the same as the issuer
/// field.
pub fn is_self_issued(cert: &Certificate) -> bool {
    compare_names(&cert.tbs_certificate.issuer, &cert.tbs_certificate.subject)
}

/// `valid_at_time` evaluates the not_before and not_after fields of the given TBSCertificate instance
/// and provides an indication of validity relative to presented time of interest.
///
/// It returns the number of seconds left to live if the certificate is valid at the given time or
/// an error indicating which field failed if the certificate is not valid. The not_before field is
/// evaluated first.
///
/// To stifle logging output upon error, pass true for the stifle_log parameter.
pub fn valid_at_time(target: &TbsCertificate, toi: u64, stifle_log: bool) -> Result<u64> {
    let nb = target.validity.not_before.to_unix_duration().as_secs();
    if nb > toi {
        if !stifle_log {
            log_error_for_name(
                &target.subject,
                format!(
                    "certificate is not yet valid relative to the configured time of interest: {}",
                    target.validity.not_before
                )
                .as_str(),
            );
        }
        return Err(Error::PathValidation(PathValidationStatus::CertNotYetValid));
    }

    let na = target.validity.not_after.to_unix_duration().as_secs();
    if na < toi {
        if !stifle_log {
            log_error_for_name(
                &target.subject,
                format!(
                    "certificate is expired relative to the configured time of interest: {}",
                    target.validity.not_after
                )
                .as_str(),
            );
        }
        Err(Error::PathValidation(PathValidationStatus::CertHasExpired))
    } else {
        Ok(na - toi)
    }
}

/// get_hash_alg_from_sig_alg takes an ObjectIdentifier that notionally contains a signature algorithm,
/// i.e., SHA_256_WITH_RSA_ENCRYPTION or ECDSA_WITH_SHA_256, and returns the indicated hash algorithm.
pub fn get_hash_alg_from_sig_alg(sig_alg: &ObjectIdentifier) -> Result<AlgorithmIdentifierOwned> {
    let oid = if SHA_256_WITH_RSA_ENCRYPTION == *sig_alg || ECDSA_WITH_SHA_256 == *sig_alg {
        ID_SHA_256
    } else if SHA_384_WITH_RSA_ENCRYPTION == *sig_alg || ECDSA_WITH_SHA_384 == *sig_alg {
        ID_SHA_384
    } else if SHA_224_WITH_RSA_ENCRYPTION == *sig_alg || ECDSA_WITH_SHA_224 == *sig_alg {
        ID_SHA_224
    } else if SHA_512_WITH_RSA_ENCRYPTION == *sig_alg || ECDSA_WITH_SHA_512 == *sig_alg {
        ID_SHA_512
    } else {
        return Err(Error::Unrecognized);
    };
    Ok(AlgorithmIdentifierOwned {
        oid,
        parameters: None,
    })
}

pub(crate) fn log_error_for_name(name: &Name, msg: &str) {
    let name_str = name_to_string(name);
    error!(
        "Encountered error while processing certificate with subject {}: {}",
        name_str, msg
    );
}

pub(crate) fn log_error_for_ca(ca: &PDVCertificate, msg: &str) {
    log_error_for_name(&ca.decoded_cert.tbs_certificate.subject, msg);
}

/// `name_to_string` returns a string representation of given Name value.
pub fn name_to_string(name: &Name) -> String {
    name.to_string()
}

/// `name_to_key` returns a normalized string used to index certificates and CRLs by name. Values are
/// lower cased with runs of whitespace collapsed so that names that satisfy [`compare_names`] usually
/// share a key. Lookups fall back to a [`compare_names`] scan when keys differ.
pub fn name_to_key(name: &Name) -> String {
    let s = name_to_string(name).to_lowercase();
    match WHITESPACE.as_ref() {
        Some(re) => re.replace_all(s.trim(), " ").to_string(),
        None => s,
    }
}

/// get_value_from_rdn returns the value from AttributeTypeAndValue as a string for use in comparing
/// values where leading whitespace may be a factor
pub fn get_value_from_rdn(atav: &AttributeTypeAndValue) -> Result<String> {
    let val = match atav.value.tag() {
        der::Tag::PrintableString => atav
            .value
            .decode_as()
            .ok()
            .map(|s: PrintableString| s.to_string()),
        der::Tag::Utf8String => atav
            .value
            .decode_as()
            .ok()
            .map(|s: Utf8StringRef<'_>| s.to_string()),
        der::Tag::Ia5String => atav
            .value
            .decode_as()
            .ok()
            .map(|s: Ia5String| s.to_string()),
        _ => None,
    };

    let mut s = "".to_string();
    if let Some(val) = val {
        let mut iter = val.char_indices().peekable();
        while let Some((i, c)) = iter.next() {
            match c {
                '#' if i == 0 => s.push_str("\\#"),
                ' ' if i == 0 || iter.peek().is_none() => s.push_str("\\ "),
                '"' | '+' | ',' | ';' | '<' | '>' | '\\' => s.push_str(format!("\\{}", c).as_str()),
                '\x00'..='\x1f' | '\x7f' => s.push_str(format!("\\{:02x}", c as u8).as_str()),
                _ => s.push(c),
            }
        }
    } else {
        let val = atav.value.to_der()?;
        s.push_str(format!("{}=#", atav.oid).as_str());
        for c in val {
            s.push_str(format!("{:02x}", c).as_str());
        }
    }
    Ok(s)
}

fn normalize_rdn_value(atav: &AttributeTypeAndValue) -> Option<String> {
    let val = get_value_from_rdn(atav).ok()?;
    let val = val.replace("\\ ", " ").trim().to_lowercase();
    match WHITESPACE.as_ref() {
        Some(re) => Some(re.replace_all(val.as_str(), " ").to_string()),
        None => Some(val),
    }
}

/// [`compare_names`] compares two Name values returning true if they match and false otherwise.
///
/// Names are compared RDN by RDN. Attribute values that are not byte-for-byte identical are
/// compared again ignoring case, leading and trailing whitespace and runs of internal whitespace.
pub fn compare_names(left: &Name, right: &Name) -> bool {
    // no match if not the same number of RDNs
    if left.0.len() != right.0.len() {
        return false;
    }

    for (lrdn, rrdn) in left.0.iter().zip(right.0.iter()) {
        if lrdn.0.len() != rrdn.0.len() {
            return false;
        }

        if lrdn == rrdn {
            continue;
        }

        for (l, r) in lrdn.0.iter().zip(rrdn.0.iter()) {
            if l.oid != r.oid {
                return false;
            }

            let l_val = normalize_rdn_value(l);
            let r_val = normalize_rdn_value(r);
            match (l_val, r_val) {
                (Some(l_val), Some(r_val)) if l_val == r_val => {}
                _ => return false,
            }
        }
    }
    true
}

/// Returns the key identifier from the subject key identifier extension, if present.
pub fn get_subject_key_identifier(cert: &PDVCertificate) -> Option<Vec<u8>> {
    if let Ok(Some(PDVExtension::SubjectKeyIdentifier(skid))) =
        cert.get_extension(&ID_CE_SUBJECT_KEY_IDENTIFIER)
    {
        return Some(skid.0.as_bytes().to_vec());
    }
    None
}

/// Returns the keyIdentifier field from the authority key identifier extension, if present.
pub fn get_authority_key_identifier(cert: &PDVCertificate) -> Option<Vec<u8>> {
    if let Ok(Some(PDVExtension::AuthorityKeyIdentifier(akid))) =
        cert.get_extension(&ID_CE_AUTHORITY_KEY_IDENTIFIER)
    {
        if let Some(kid) = &akid.key_identifier {
            return Some(kid.as_bytes().to_vec());
        }
    }
    None
}

/// Returns the key usage bits asserted by the certificate, or None when the extension is absent.
pub fn get_key_usage(cert: &PDVCertificate) -> Option<FlagSet<KeyUsages>> {
    if let Ok(Some(PDVExtension::KeyUsage(ku))) = cert.get_extension(&ID_CE_KEY_USAGE) {
        return Some(ku.0);
    }
    None
}

/// Returns the pathLenConstraint from the basic constraints extension, if present.
pub fn get_path_length_constraint(cert: &PDVCertificate) -> Option<u8> {
    match cert.get_extension(&ID_CE_BASIC_CONSTRAINTS) {
        Ok(Some(PDVExtension::BasicConstraints(bc))) => bc.path_len_constraint,
        _ => None,
    }
}

/// Returns true if the certificate features a basic constraints extension with the cA field set.
pub fn is_ca(cert: &PDVCertificate) -> bool {
    matches!(
        cert.get_extension(&ID_CE_BASIC_CONSTRAINTS),
        Ok(Some(PDVExtension::BasicConstraints(bc))) if bc.ca
    )
}

#[test]
fn compare_names_test() {
    use core::str::FromStr;

    let n1 = Name::from_str("CN=Joe,OU=Org Unit,O=Org,C=US").unwrap();
    let n2 = Name::from_str("CN=joe,OU=Org   Unit,O=Org,C=US").unwrap();
    let n3 = Name::from_str("CN=Sue,OU=Org Unit,O=Org,C=US").unwrap();
    let n4 = Name::from_str("CN=Joe,O=Org,C=US").unwrap();
    assert!(compare_names(&n1, &n1));
    assert!(compare_names(&n1, &n2));
    assert!(!compare_names(&n1, &n3));
    assert!(!compare_names(&n1, &n4));
    assert_eq!(name_to_key(&n1), name_to_key(&n2));
    assert_ne!(name_to_key(&n1), name_to_key(&n3));
}

#[test]
fn rdn_value_test() {
    use core::str::FromStr;

    let n = Name::from_str("CN=Joe Smith,O=Org").unwrap();
    let vals: Vec<String> = n
        .0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .map(|atav| get_value_from_rdn(atav).unwrap())
        .collect();
    assert!(vals.contains(&"Joe Smith".to_string()));
    assert!(vals.contains(&"Org".to_string()));
}

#[test]
fn hash_alg_from_sig_alg_test() {
    assert_eq!(
        ID_SHA_256,
        get_hash_alg_from_sig_alg(&ECDSA_WITH_SHA_256).unwrap().oid
    );
    assert_eq!(
        ID_SHA_384,
        get_hash_alg_from_sig_alg(&SHA_384_WITH_RSA_ENCRYPTION)
            .unwrap()
            .oid
    );
    assert!(get_hash_alg_from_sig_alg(&ID_SHA_256).is_err());
}
