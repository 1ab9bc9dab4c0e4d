//! Decoded certificates paired with their encoding and the extensions consulted during chain building
//! and path validation

use alloc::collections::BTreeMap;
use alloc::{
    string::{String, ToString},
    vec::Vec,
};

use const_oid::db::rfc5912::{
    ID_CE_AUTHORITY_KEY_IDENTIFIER, ID_CE_BASIC_CONSTRAINTS, ID_CE_EXT_KEY_USAGE, ID_CE_KEY_USAGE,
    ID_CE_SUBJECT_KEY_IDENTIFIER,
};
use der::asn1::BitString;
use der::{asn1::ObjectIdentifier, Decode};
use log::error;
use spki::AlgorithmIdentifierOwned;
use x509_cert::ext::pkix::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectKeyIdentifier,
};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::Certificate;

use crate::pdv_extension::*;
use crate::util::error::*;

/// `EXTS_OF_INTEREST` lists the extensions that are parsed and cached when a [`PDVCertificate`] is
/// prepared. A critical extension outside this list, other than subjectAltName, fails path validation.
pub static EXTS_OF_INTEREST: &[ObjectIdentifier] = &[
    ID_CE_BASIC_CONSTRAINTS,
    ID_CE_KEY_USAGE,
    ID_CE_EXT_KEY_USAGE,
    ID_CE_SUBJECT_KEY_IDENTIFIER,
    ID_CE_AUTHORITY_KEY_IDENTIFIER,
];

/// Metadata keyed by name. Only [`MD_LOCATOR`] is currently populated.
pub type Asn1Metadata = BTreeMap<String, Asn1MetadataTypes>;

/// [`MD_LOCATOR`] is used to set/get a String value to/from an [`Asn1Metadata`] object. The value
/// may represent a file name or other locator for troubleshooting purposes.
pub static MD_LOCATOR: &str = "mdLocator";

/// Metadata values attached to a certificate or CRL.
#[derive(PartialEq, Clone, Eq, Debug)]
pub enum Asn1MetadataTypes {
    /// Textual metadata, i.e., a locator
    String(String),
}

/// [`PDVCertificate`] pairs a DER-encoded certificate with its decoded form, an optional locator and the
/// extensions cached at parse time.
///
/// The parsed extensions are those listed in [`EXTS_OF_INTEREST`]. Instances are immutable once added
/// to a store and are shared via `Arc`.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct PDVCertificate {
    /// Binary, encoded Certificate object
    pub encoded_cert: Vec<u8>,
    /// Decoded Certificate object
    pub decoded_cert: Certificate,
    /// Optional metadata about the certificate
    pub metadata: Option<Asn1Metadata>,
    /// Parsed extensions from the Certificate
    pub parsed_extensions: ParsedExtensions,
}

impl TryFrom<&[u8]> for PDVCertificate {
    type Error = der::Error;

    fn try_from(enc_cert: &[u8]) -> der::Result<Self> {
        let cert = Certificate::from_der(enc_cert)?;
        let mut pdv_cert = PDVCertificate {
            encoded_cert: enc_cert.to_vec(),
            decoded_cert: cert,
            metadata: None,
            parsed_extensions: Default::default(),
        };
        pdv_cert.parse_extensions(EXTS_OF_INTEREST);
        Ok(pdv_cert)
    }
}

impl PDVCertificate {
    /// Returns the subject name from the certificate.
    pub fn subject(&self) -> &Name {
        &self.decoded_cert.tbs_certificate.subject
    }

    /// Returns the issuer name from the certificate.
    pub fn issuer(&self) -> &Name {
        &self.decoded_cert.tbs_certificate.issuer
    }

    /// Returns the serial number from the certificate.
    pub fn serial_number(&self) -> &SerialNumber {
        &self.decoded_cert.tbs_certificate.serial_number
    }

    /// Returns the notBefore value as seconds since the Unix epoch.
    pub fn not_before(&self) -> u64 {
        self.decoded_cert
            .tbs_certificate
            .validity
            .not_before
            .to_unix_duration()
            .as_secs()
    }

    /// Returns the notAfter value as seconds since the Unix epoch.
    pub fn not_after(&self) -> u64 {
        self.decoded_cert
            .tbs_certificate
            .validity
            .not_after
            .to_unix_duration()
            .as_secs()
    }

    /// Returns the locator saved in the metadata, if any.
    pub fn locator(&self) -> Option<&str> {
        if let Some(md) = &self.metadata {
            if let Some(Asn1MetadataTypes::String(s)) = md.get(MD_LOCATOR) {
                return Some(s.as_str());
            }
        }
        None
    }
}

impl ExtensionProcessing for PDVCertificate {
    /// `get_extension` takes an ObjectIdentifier that identifies and extension type and returns
    /// a previously parsed [`PDVExtension`] instance containing the decoded extension if the extension was present.
    fn get_extension(&self, oid: &ObjectIdentifier) -> Result<Option<&'_ PDVExtension>> {
        Ok(self.parsed_extensions.get(oid))
    }

    fn parse_extensions(&'_ mut self, oids: &[ObjectIdentifier]) {
        for oid in oids {
            if let Err(e) = self.parse_extension(oid) {
                error!(
                    "Failed to parse extension {} from certificate issued to {}: {}",
                    oid,
                    self.decoded_cert.tbs_certificate.subject,
                    e
                );
            }
        }
    }

    fn parse_extension(&mut self, oid: &ObjectIdentifier) -> Result<Option<&PDVExtension>> {
        macro_rules! add_and_return {
            ($pe:ident, $v:ident, $t:ident) => {
                match $t::from_der($v) {
                    Ok(r) => {
                        let ext = PDVExtension::$t(r);
                        $pe.insert(*oid, ext);
                        return Ok($pe.get(oid));
                    }
                    Err(e) => {
                        return Err(Error::Asn1Error(e));
                    }
                }
            };
        }

        let pe = &mut self.parsed_extensions;
        if pe.contains_key(oid) {
            return Ok(pe.get(oid));
        }

        if let Some(exts) = self.decoded_cert.tbs_certificate.extensions.as_ref() {
            if let Some(i) = exts.iter().find(|&ext| ext.extn_id == *oid) {
                let v = i.extn_value.as_bytes();
                match *oid {
                    ID_CE_BASIC_CONSTRAINTS => {
                        add_and_return!(pe, v, BasicConstraints);
                    }
                    ID_CE_SUBJECT_KEY_IDENTIFIER => {
                        add_and_return!(pe, v, SubjectKeyIdentifier);
                    }
                    ID_CE_EXT_KEY_USAGE => {
                        add_and_return!(pe, v, ExtendedKeyUsage);
                    }
                    ID_CE_KEY_USAGE => {
                        add_and_return!(pe, v, KeyUsage);
                    }
                    ID_CE_AUTHORITY_KEY_IDENTIFIER => {
                        add_and_return!(pe, v, AuthorityKeyIdentifier);
                    }
                    _ => {
                        // ignore unrecognized
                    }
                }
            }
        }
        Ok(None)
    }
}

/// [`DeferDecodeSigned`] used to parse only the top-level structure of a signed object, i.e., a Certificate
/// or CertificateList, without parsing the details of the to-be-signed, AlgorithmIdentifier or BIT STRING fields.
///
/// Deferred decoding is useful when verifying signatures to avoid re-encoding the to-be-signed field
/// (and potentially encountering problems with structures that were not DER-encoded prior to signing).
pub struct DeferDecodeSigned {
    /// tbsCertificate or tbsCertList
    pub tbs_field: Vec<u8>,
    /// signatureAlgorithm   AlgorithmIdentifier,
    pub signature_algorithm: AlgorithmIdentifierOwned,
    /// signature            BIT STRING
    pub signature: BitString,
}

impl ::der::FixedTag for DeferDecodeSigned {
    const TAG: ::der::Tag = ::der::Tag::Sequence;
}

impl<'a> ::der::DecodeValue<'a> for DeferDecodeSigned {
    fn decode_value<R: ::der::Reader<'a>>(
        reader: &mut R,
        header: ::der::Header,
    ) -> ::der::Result<Self> {
        use ::der::Reader as _;
        reader.read_nested(header.length, |reader| {
            let tbs_field = reader.tlv_bytes()?;
            let signature_algorithm = reader.decode()?;
            let signature = reader.decode()?;
            Ok(Self {
                tbs_field: tbs_field.to_vec(),
                signature_algorithm,
                signature,
            })
        })
    }
}

/// `parse_cert` takes a buffer containing a binary DER encoded certificate and returns
/// a [`PDVCertificate`] containing the parsed certificate if parsing was successful. The
/// `filename` is saved as the [`MD_LOCATOR`] metadata value.
pub fn parse_cert(buffer: &[u8], filename: &str) -> Result<PDVCertificate> {
    match PDVCertificate::try_from(buffer) {
        Ok(mut pdvcert) => {
            let mut md = Asn1Metadata::new();
            md.insert(
                MD_LOCATOR.to_string(),
                Asn1MetadataTypes::String(filename.to_string()),
            );
            pdvcert.metadata = Some(md);
            Ok(pdvcert)
        }
        Err(e) => {
            error!("Failed to parse certificate from {}: {}", filename, e);
            Err(Error::Asn1Error(e))
        }
    }
}
