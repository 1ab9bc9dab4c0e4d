//! Provides implementations of crypto-related [`PkiEnvironment`] interfaces using libraries from the
//! [Rust Crypto](https://github.com/RustCrypto) project for support.

use alloc::vec::Vec;

use const_oid::db::rfc5912::{
    ECDSA_WITH_SHA_224, ECDSA_WITH_SHA_256, ECDSA_WITH_SHA_384, ECDSA_WITH_SHA_512, ID_SHA_224,
    ID_SHA_256, ID_SHA_384, ID_SHA_512, SECP_256_R_1, SHA_224_WITH_RSA_ENCRYPTION,
    SHA_256_WITH_RSA_ENCRYPTION, SHA_384_WITH_RSA_ENCRYPTION, SHA_512_WITH_RSA_ENCRYPTION,
};
use der::{asn1::ObjectIdentifier, Encode};
use log::error;
use p256::ecdsa::{
    signature::Verifier as Verifier256, Signature as Signature256, VerifyingKey as VerifyingKey256,
};
use rsa::{pkcs8::DecodePublicKey, Pkcs1v15Sign, RsaPublicKey};
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::environment::pki_environment::PkiEnvironment;
use crate::util::error::{Error, PathValidationStatus, Result};
use crate::util::pdv_utilities::get_hash_alg_from_sig_alg;

/// get_padding_scheme takes an AlgorithmIdentifier containing a signature algorithm and returns
/// a corresponding PKCS #1 v1.5 signature scheme instance.
///
/// Only the [`SHA_224_WITH_RSA_ENCRYPTION`], [`SHA_256_WITH_RSA_ENCRYPTION`],
/// [`SHA_384_WITH_RSA_ENCRYPTION`] and [`SHA_512_WITH_RSA_ENCRYPTION`] algorithm identifiers are supported.
pub fn get_padding_scheme(signature_alg: &AlgorithmIdentifierOwned) -> Result<Pkcs1v15Sign> {
    match signature_alg.oid {
        SHA_256_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha256>()),
        SHA_384_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha384>()),
        SHA_224_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha224>()),
        SHA_512_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha512>()),
        _ => Err(Error::Unrecognized),
    }
}

/// is_rsa returns true is the presented OID is one of the supported RSA PKCS #1 v1.5 signature
/// algorithms and false otherwise.
pub(crate) fn is_rsa(oid: &ObjectIdentifier) -> bool {
    *oid == SHA_256_WITH_RSA_ENCRYPTION
        || *oid == SHA_384_WITH_RSA_ENCRYPTION
        || *oid == SHA_224_WITH_RSA_ENCRYPTION
        || *oid == SHA_512_WITH_RSA_ENCRYPTION
}

/// is_ecdsa returns true is the presented OID is one of the ECDSA signature algorithms and false otherwise.
pub(crate) fn is_ecdsa(oid: &ObjectIdentifier) -> bool {
    *oid == ECDSA_WITH_SHA_256
        || *oid == ECDSA_WITH_SHA_384
        || *oid == ECDSA_WITH_SHA_224
        || *oid == ECDSA_WITH_SHA_512
}

/// calculate_hash_rust_crypto implements the [`CalculateHash`](crate::CalculateHash) interface for
/// [`PkiEnvironment`] using implementations from the Rust Crypto project.
///
/// It supports [`ID_SHA_224`], [`ID_SHA_256`], [`ID_SHA_384`] and [`ID_SHA_512`].
pub fn calculate_hash_rust_crypto(
    _pe: &PkiEnvironment,
    hash_alg: &AlgorithmIdentifierOwned,
    buffer_to_hash: &[u8],
) -> Result<Vec<u8>> {
    match hash_alg.oid {
        ID_SHA_224 => Ok(Sha224::digest(buffer_to_hash).to_vec()),
        ID_SHA_256 => Ok(Sha256::digest(buffer_to_hash).to_vec()),
        ID_SHA_384 => Ok(Sha384::digest(buffer_to_hash).to_vec()),
        ID_SHA_512 => Ok(Sha512::digest(buffer_to_hash).to_vec()),
        _ => Err(Error::Unrecognized),
    }
}

fn get_named_curve_parameter(alg_id: &AlgorithmIdentifierOwned) -> Result<ObjectIdentifier> {
    if let Some(params) = &alg_id.parameters {
        if let Ok(oid) = params.decode_as::<ObjectIdentifier>() {
            return Ok(oid);
        }
    }
    Err(Error::PathValidation(
        PathValidationStatus::UnableToDecodeIssuerPublicKey,
    ))
}

/// verify_signature_message_rust_crypto implements the [`VerifySignatureMessage`](crate::VerifySignatureMessage)
/// interface for [`PkiEnvironment`] using implementations from the [Rust Crypto](https://github.com/RustCrypto) project.
///
/// RSA PKCS #1 v1.5 signatures and ECDSA signatures using P256 are supported at present. A key that
/// cannot be decoded yields [`PathValidationStatus::UnableToDecodeIssuerPublicKey`] and a signature that
/// does not verify yields [`PathValidationStatus::CertSignatureFailure`]. Callers that verify CRLs map
/// the latter to the CRL-specific status.
pub fn verify_signature_message_rust_crypto(
    pe: &PkiEnvironment,
    message_to_verify: &[u8],                // buffer to verify
    signature: &[u8],                        // signature
    signature_alg: &AlgorithmIdentifierOwned, // signature algorithm
    spki: &SubjectPublicKeyInfoOwned,        // public key
) -> Result<()> {
    if is_rsa(&signature_alg.oid) {
        let enc_spki = spki.to_der()?;
        let rsa = match RsaPublicKey::from_public_key_der(&enc_spki) {
            Ok(rsa) => rsa,
            Err(e) => {
                error!("Failed to decode RSA public key: {:?}", e);
                return Err(Error::PathValidation(
                    PathValidationStatus::UnableToDecodeIssuerPublicKey,
                ));
            }
        };
        let hash_alg = get_hash_alg_from_sig_alg(&signature_alg.oid)?;
        let hash_to_verify = calculate_hash_rust_crypto(pe, &hash_alg, message_to_verify)?;
        let ps = get_padding_scheme(signature_alg)?;
        return match rsa.verify(ps, hash_to_verify.as_slice(), signature) {
            Ok(_) => Ok(()),
            Err(_e) => Err(Error::PathValidation(
                PathValidationStatus::CertSignatureFailure,
            )),
        };
    } else if is_ecdsa(&signature_alg.oid) {
        let named_curve = get_named_curve_parameter(&spki.algorithm)?;

        return match named_curve {
            SECP_256_R_1 => {
                if signature_alg.oid != ECDSA_WITH_SHA_256 {
                    error!(
                        "Unsupported digest for P256 signature: {}",
                        signature_alg.oid
                    );
                    return Err(Error::Unrecognized);
                }
                let ecdsa = match VerifyingKey256::from_sec1_bytes(spki.subject_public_key.raw_bytes())
                {
                    Ok(ecdsa) => ecdsa,
                    Err(_e) => {
                        return Err(Error::PathValidation(
                            PathValidationStatus::UnableToDecodeIssuerPublicKey,
                        ))
                    }
                };
                let s = match Signature256::from_der(signature) {
                    Ok(s) => s,
                    Err(_e) => {
                        return Err(Error::PathValidation(
                            PathValidationStatus::CertSignatureFailure,
                        ))
                    }
                };
                match ecdsa.verify(message_to_verify, &s) {
                    Ok(_) => Ok(()),
                    Err(_e) => Err(Error::PathValidation(
                        PathValidationStatus::CertSignatureFailure,
                    )),
                }
            }
            _ => {
                error!("Unrecognized or unsupported named curve: {}", named_curve);
                Err(Error::PathValidation(
                    PathValidationStatus::UnableToDecodeIssuerPublicKey,
                ))
            }
        };
    }
    error!("Unrecognized signature algorithm: {}", signature_alg.oid);
    Err(Error::Unrecognized)
}

#[test]
fn test_calculate_hash() {
    use crate::PkiEnvironment;
    use hex_literal::hex;
    let mut pe = PkiEnvironment::default();
    pe.clear_all_callbacks();
    pe.add_calculate_hash_callback(calculate_hash_rust_crypto);

    let hash_algorithm = AlgorithmIdentifierOwned {
        oid: ID_SHA_256,
        parameters: None,
    };
    let result = pe
        .calculate_hash(&pe, &hash_algorithm, "abc".as_bytes())
        .unwrap();
    assert_eq!(
        result,
        hex!("BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD")
    );

    let unsupported = AlgorithmIdentifierOwned {
        oid: ECDSA_WITH_SHA_256,
        parameters: None,
    };
    assert!(pe
        .calculate_hash(&pe, &unsupported, "abc".as_bytes())
        .is_err());
}

#[test]
fn test_algorithm_classification() {
    assert!(is_rsa(&SHA_256_WITH_RSA_ENCRYPTION));
    assert!(!is_rsa(&ECDSA_WITH_SHA_256));
    assert!(is_ecdsa(&ECDSA_WITH_SHA_384));
    assert!(!is_ecdsa(&SHA_512_WITH_RSA_ENCRYPTION));
    let alg = AlgorithmIdentifierOwned {
        oid: ECDSA_WITH_SHA_256,
        parameters: None,
    };
    assert!(get_padding_scheme(&alg).is_err());
}
