//! Error types

use core::fmt;

/// Result type
pub type Result<T> = core::result::Result<T, Error>;

/// `PathValidationStatus` enumerates the outcomes of a verification operation. Numeric values returned
/// by [`PathValidationStatus::code`] match those used by OpenSSL's `X509_V_ERR_*` constants and the strings
/// produced via `Display` match the corresponding OpenSSL error strings.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub enum PathValidationStatus {
    /// No errors were encountered while validating certification path
    Ok,
    /// Verification failed for a reason not covered by another status, e.g., rejection by a verify callback.
    Unspecified,
    /// The public key from an issuer certificate could not be decoded or is of an unsupported type.
    UnableToDecodeIssuerPublicKey,
    /// The signature on a certificate did not verify using the public key of the next certificate in the chain.
    CertSignatureFailure,
    /// The signature on a CRL did not verify using the public key of the CRL issuer.
    CrlSignatureFailure,
    /// A certificate in the chain contains a notBefore date that is after the time of interest.
    CertNotYetValid,
    /// A certificate in the chain contains a notAfter date that is before the time of interest.
    CertHasExpired,
    /// A CRL contains a thisUpdate date that is after the time of interest.
    CrlNotYetValid,
    /// A CRL contains a nextUpdate date that is before the time of interest.
    CrlHasExpired,
    /// The target certificate is self-signed and is not among the trust anchors.
    DepthZeroSelfSignedCert,
    /// The chain ends in a self-signed certificate that is not among the trust anchors.
    SelfSignedCertInChain,
    /// No issuer could be found for a certificate and the certificate is not a trust anchor.
    UnableToGetIssuerCertLocally,
    /// The chain exceeded the configured maximum length.
    ChainTooLong,
    /// A certificate in the chain was found on a CRL.
    CertRevoked,
    /// A non-leaf certificate in the chain is not a CA certificate.
    InvalidCa,
    /// More non-self-issued intermediate certificates follow a CA than its pathLenConstraint permits.
    PathLengthExceeded,
    /// The target certificate does not satisfy the configured purpose.
    InvalidPurpose,
    /// The issuer of a CRL could not be determined.
    UnableToGetCrlIssuer,
    /// A certificate in the chain contains a critical extension that is not processed.
    UnhandledCriticalExtension,
    /// The CRL issuer's key usage extension does not include cRLSign.
    KeyUsageNoCrlSign,
    /// A CRL contains a critical extension that is not supported.
    UnhandledCriticalCrlExtension,
}

impl PathValidationStatus {
    /// Returns the OpenSSL-compatible numeric value for the status.
    pub fn code(&self) -> i32 {
        match self {
            PathValidationStatus::Ok => 0,
            PathValidationStatus::Unspecified => 1,
            PathValidationStatus::UnableToDecodeIssuerPublicKey => 6,
            PathValidationStatus::CertSignatureFailure => 7,
            PathValidationStatus::CrlSignatureFailure => 8,
            PathValidationStatus::CertNotYetValid => 9,
            PathValidationStatus::CertHasExpired => 10,
            PathValidationStatus::CrlNotYetValid => 11,
            PathValidationStatus::CrlHasExpired => 12,
            PathValidationStatus::DepthZeroSelfSignedCert => 18,
            PathValidationStatus::SelfSignedCertInChain => 19,
            PathValidationStatus::UnableToGetIssuerCertLocally => 20,
            PathValidationStatus::ChainTooLong => 22,
            PathValidationStatus::CertRevoked => 23,
            PathValidationStatus::InvalidCa => 24,
            PathValidationStatus::PathLengthExceeded => 25,
            PathValidationStatus::InvalidPurpose => 26,
            PathValidationStatus::UnableToGetCrlIssuer => 33,
            PathValidationStatus::UnhandledCriticalExtension => 34,
            PathValidationStatus::KeyUsageNoCrlSign => 35,
            PathValidationStatus::UnhandledCriticalCrlExtension => 36,
        }
    }
}

/// Error type
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// PathValidationError encountered
    PathValidation(PathValidationStatus),
    /// NotFound occurs when an action failed because a necessary artifact was not found.
    NotFound,
    /// Unrecognized occurs when an error conditions does not match anything else here.
    Unrecognized,
    /// An artifact could not be parsed
    ParseError,
    /// Asn1Error is used to propagate error information from the x509 crate.
    Asn1Error(der::Error),
    /// Error encapsulates an error derived from [std::io::ErrorKind]
    StdIoError(std::io::ErrorKind),
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        Error::Asn1Error(err)
    }
}

impl From<PathValidationStatus> for Error {
    fn from(status: PathValidationStatus) -> Error {
        Error::PathValidation(status)
    }
}

impl fmt::Display for PathValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathValidationStatus::Ok => write!(f, "ok"),
            PathValidationStatus::Unspecified => {
                write!(f, "unspecified certificate verification error")
            }
            PathValidationStatus::UnableToDecodeIssuerPublicKey => {
                write!(f, "unable to decode issuer public key")
            }
            PathValidationStatus::CertSignatureFailure => {
                write!(f, "certificate signature failure")
            }
            PathValidationStatus::CrlSignatureFailure => write!(f, "CRL signature failure"),
            PathValidationStatus::CertNotYetValid => write!(f, "certificate is not yet valid"),
            PathValidationStatus::CertHasExpired => write!(f, "certificate has expired"),
            PathValidationStatus::CrlNotYetValid => write!(f, "CRL is not yet valid"),
            PathValidationStatus::CrlHasExpired => write!(f, "CRL has expired"),
            PathValidationStatus::DepthZeroSelfSignedCert => write!(f, "self signed certificate"),
            PathValidationStatus::SelfSignedCertInChain => {
                write!(f, "self signed certificate in certificate chain")
            }
            PathValidationStatus::UnableToGetIssuerCertLocally => {
                write!(f, "unable to get local issuer certificate")
            }
            PathValidationStatus::ChainTooLong => write!(f, "certificate chain too long"),
            PathValidationStatus::CertRevoked => write!(f, "certificate revoked"),
            PathValidationStatus::InvalidCa => write!(f, "invalid CA certificate"),
            PathValidationStatus::PathLengthExceeded => {
                write!(f, "path length constraint exceeded")
            }
            PathValidationStatus::InvalidPurpose => write!(f, "unsupported certificate purpose"),
            PathValidationStatus::UnableToGetCrlIssuer => {
                write!(f, "unable to get CRL issuer certificate")
            }
            PathValidationStatus::UnhandledCriticalExtension => {
                write!(f, "unhandled critical extension")
            }
            PathValidationStatus::KeyUsageNoCrlSign => {
                write!(f, "key usage does not include CRL signing")
            }
            PathValidationStatus::UnhandledCriticalCrlExtension => {
                write!(f, "unhandled critical CRL extension")
            }
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::PathValidation(err) => write!(f, "PathValidationError: {}", err),
            Error::NotFound => write!(f, "NotFound"),
            Error::Unrecognized => write!(f, "Unrecognized"),
            Error::ParseError => write!(f, "ParseError"),
            Error::Asn1Error(err) => write!(f, "Asn1Error: {}", err),
            Error::StdIoError(err) => write!(f, "StdError: {:?}", err),
        }
    }
}

impl std::error::Error for Error {}

#[test]
fn error_test() {
    use alloc::format;

    assert_eq!("ok", format!("{}", PathValidationStatus::Ok));
    assert_eq!(
        "certificate signature failure",
        format!("{}", PathValidationStatus::CertSignatureFailure)
    );
    assert_eq!(
        "certificate is not yet valid",
        format!("{}", PathValidationStatus::CertNotYetValid)
    );
    assert_eq!(
        "certificate has expired",
        format!("{}", PathValidationStatus::CertHasExpired)
    );
    assert_eq!(
        "unable to get local issuer certificate",
        format!("{}", PathValidationStatus::UnableToGetIssuerCertLocally)
    );
    assert_eq!("CRL has expired", format!("{}", PathValidationStatus::CrlHasExpired));
    assert_eq!("certificate revoked", format!("{}", PathValidationStatus::CertRevoked));
    assert_eq!("invalid CA certificate", format!("{}", PathValidationStatus::InvalidCa));
    assert_eq!(
        "unsupported certificate purpose",
        format!("{}", PathValidationStatus::InvalidPurpose)
    );
    assert_eq!(
        "certificate chain too long",
        format!("{}", PathValidationStatus::ChainTooLong)
    );
    let _s = format!("{}", PathValidationStatus::UnableToDecodeIssuerPublicKey);
    let _s = format!("{}", PathValidationStatus::CrlSignatureFailure);
    let _s = format!("{}", PathValidationStatus::CrlNotYetValid);
    let _s = format!("{}", PathValidationStatus::DepthZeroSelfSignedCert);
    let _s = format!("{}", PathValidationStatus::SelfSignedCertInChain);
    let _s = format!("{}", PathValidationStatus::UnableToGetCrlIssuer);
    let _s = format!("{}", PathValidationStatus::KeyUsageNoCrlSign);
    let _s = format!("{:?}", PathValidationStatus::UnhandledCriticalCrlExtension);

    assert_eq!(0, PathValidationStatus::Ok.code());
    assert_eq!(1, PathValidationStatus::Unspecified.code());
    assert_eq!(7, PathValidationStatus::CertSignatureFailure.code());
    assert_eq!(9, PathValidationStatus::CertNotYetValid.code());
    assert_eq!(10, PathValidationStatus::CertHasExpired.code());
    assert_eq!(12, PathValidationStatus::CrlHasExpired.code());
    assert_eq!(20, PathValidationStatus::UnableToGetIssuerCertLocally.code());
    assert_eq!(23, PathValidationStatus::CertRevoked.code());
    assert_eq!(25, PathValidationStatus::PathLengthExceeded.code());
    assert_eq!(34, PathValidationStatus::UnhandledCriticalExtension.code());
    assert_eq!(
        "path length constraint exceeded",
        format!("{}", PathValidationStatus::PathLengthExceeded)
    );
    assert_eq!(
        "unhandled critical extension",
        format!("{}", PathValidationStatus::UnhandledCriticalExtension)
    );

    let _s = format!(
        "{}",
        Error::PathValidation(PathValidationStatus::CertRevoked)
    );
    let _s = format!("{}", Error::NotFound);
    let _s = format!("{}", Error::Unrecognized);
    let _s = format!("{}", Error::ParseError);
    let _s = format!("{}", Error::StdIoError(std::io::ErrorKind::NotFound));
}
