//! Purpose definitions and the key usage and extended key usage rules applied to target certificates

use const_oid::db::rfc5280::{
    ID_KP_CLIENT_AUTH, ID_KP_EMAIL_PROTECTION, ID_KP_SERVER_AUTH, ID_KP_TIME_STAMPING,
};
use const_oid::db::rfc5912::{ID_CE_EXT_KEY_USAGE, ID_CE_KEY_USAGE};
use core::fmt;
use core::str::FromStr;
use der::asn1::ObjectIdentifier;
use flagset::FlagSet;
use serde::{Deserialize, Serialize};
use x509_cert::ext::pkix::KeyUsages;

use crate::{
    log_error_for_ca, CertificationPath, CertificationPathResults, CertificationPathSettings,
    Error, ExtensionProcessing, PDVCertificate, PDVExtension, PathValidationStatus, PkiEnvironment,
    Result,
};

/// anyExtendedKeyUsage from RFC 5280 section 4.2.1.12
pub const ANY_EXTENDED_KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.37.0");

/// `Purpose` names a bundle of key usage and extended key usage requirements that a target certificate
/// must satisfy. Discriminants follow OpenSSL's `X509_PURPOSE_*` numbering.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Purpose {
    /// TLS client authentication
    SslClient = 1,
    /// TLS server authentication
    SslServer = 2,
    /// S/MIME signing
    SmimeSign = 4,
    /// S/MIME encryption
    SmimeEncrypt = 5,
    /// CRL signing
    CrlSign = 6,
    /// No purpose check is performed
    Any = 7,
    /// Time stamp signing
    TimestampSign = 9,
}

impl Default for Purpose {
    fn default() -> Self {
        Purpose::Any
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Purpose::SslClient => "ssl-client",
            Purpose::SslServer => "ssl-server",
            Purpose::SmimeSign => "smime-sign",
            Purpose::SmimeEncrypt => "smime-encrypt",
            Purpose::CrlSign => "crl-sign",
            Purpose::Any => "any",
            Purpose::TimestampSign => "timestamp-sign",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Purpose {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "ssl-client" | "sslclient" => Ok(Purpose::SslClient),
            "ssl-server" | "sslserver" => Ok(Purpose::SslServer),
            "smime-sign" | "smimesign" => Ok(Purpose::SmimeSign),
            "smime-encrypt" | "smimeencrypt" => Ok(Purpose::SmimeEncrypt),
            "crl-sign" | "crlsign" => Ok(Purpose::CrlSign),
            "any" => Ok(Purpose::Any),
            "timestamp-sign" | "timestampsign" => Ok(Purpose::TimestampSign),
            _ => Err(Error::Unrecognized),
        }
    }
}

impl Purpose {
    /// Key usage bits of which at least one must be asserted when the target has a key usage extension.
    /// `None` means key usage is not evaluated.
    fn key_usages(&self) -> Option<FlagSet<KeyUsages>> {
        match self {
            Purpose::SslClient => Some(KeyUsages::DigitalSignature | KeyUsages::KeyAgreement),
            Purpose::SslServer => Some(
                KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment | KeyUsages::KeyAgreement,
            ),
            Purpose::SmimeSign | Purpose::TimestampSign => {
                Some(KeyUsages::DigitalSignature | KeyUsages::NonRepudiation)
            }
            Purpose::SmimeEncrypt => {
                Some(KeyUsages::KeyEncipherment | KeyUsages::KeyAgreement)
            }
            Purpose::CrlSign => Some(KeyUsages::CRLSign.into()),
            Purpose::Any => None,
        }
    }

    /// Extended key usage values of which at least one must be present when the target has an extended
    /// key usage extension. `None` means extended key usage is not evaluated.
    fn extended_key_usages(&self) -> Option<&'static [ObjectIdentifier]> {
        match self {
            Purpose::SslClient => Some(&[ID_KP_CLIENT_AUTH, ANY_EXTENDED_KEY_USAGE]),
            Purpose::SslServer => Some(&[ID_KP_SERVER_AUTH, ANY_EXTENDED_KEY_USAGE]),
            Purpose::SmimeSign | Purpose::SmimeEncrypt => {
                Some(&[ID_KP_EMAIL_PROTECTION, ANY_EXTENDED_KEY_USAGE])
            }
            Purpose::TimestampSign => Some(&[ID_KP_TIME_STAMPING]),
            Purpose::CrlSign | Purpose::Any => None,
        }
    }

    /// Returns true if an extended key usage extension must be present.
    fn requires_extended_key_usage(&self) -> bool {
        matches!(self, Purpose::TimestampSign)
    }
}

/// `purpose_satisfied` returns true if the certificate satisfies the key usage and extended key usage
/// requirements associated with `purpose`.
pub fn purpose_satisfied(cert: &PDVCertificate, purpose: Purpose) -> bool {
    if let Some(required) = purpose.key_usages() {
        if let Ok(Some(PDVExtension::KeyUsage(ku))) = cert.get_extension(&ID_CE_KEY_USAGE) {
            if (ku.0 & required).is_empty() {
                return false;
            }
        }
    }

    if let Some(required) = purpose.extended_key_usages() {
        match cert.get_extension(&ID_CE_EXT_KEY_USAGE) {
            Ok(Some(PDVExtension::ExtendedKeyUsage(eku))) => {
                if !eku.0.iter().any(|oid| required.contains(oid)) {
                    return false;
                }
            }
            _ => {
                if purpose.requires_extended_key_usage() {
                    return false;
                }
            }
        }
    }
    true
}

/// `check_purpose` evaluates the target certificate in the certification path against the purpose
/// configured via `PS_PURPOSE`. No checks are performed when the purpose is [`Purpose::Any`].
///
/// Failures are reported as [`PathValidationStatus::InvalidPurpose`] at depth 0.
pub fn check_purpose(
    _pe: &PkiEnvironment,
    cps: &CertificationPathSettings,
    cp: &mut CertificationPath,
    cpr: &mut CertificationPathResults,
) -> Result<()> {
    let purpose = cps.get_purpose();
    if Purpose::Any == purpose {
        return Ok(());
    }

    let target = cp.target();
    if !purpose_satisfied(target, purpose) {
        log_error_for_ca(
            target,
            format!("target certificate does not satisfy purpose {}", purpose).as_str(),
        );
        cpr.set_error_depth(0);
        cpr.set_validation_status(PathValidationStatus::InvalidPurpose);
        return Err(Error::PathValidation(PathValidationStatus::InvalidPurpose));
    }
    Ok(())
}

#[test]
fn purpose_from_str_test() {
    assert_eq!(Purpose::SslClient, Purpose::from_str("ssl-client").unwrap());
    assert_eq!(Purpose::SslServer, Purpose::from_str("SSL_SERVER").unwrap());
    assert_eq!(Purpose::TimestampSign, Purpose::from_str("timestamp-sign").unwrap());
    assert_eq!(Purpose::Any, Purpose::default());
    assert!(Purpose::from_str("gibberish").is_err());
    for p in [
        Purpose::SslClient,
        Purpose::SslServer,
        Purpose::SmimeSign,
        Purpose::SmimeEncrypt,
        Purpose::CrlSign,
        Purpose::Any,
        Purpose::TimestampSign,
    ] {
        assert_eq!(p, Purpose::from_str(&p.to_string()).unwrap());
    }
    assert_eq!(9, Purpose::TimestampSign as i32);
}
