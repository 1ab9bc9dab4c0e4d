//! The file_utils module contains utility functions related to interactions with the filesystem.

use std::path::Path;

use der::Decode;
use log::{debug, error};
use rustls_pemfile::Item;
use walkdir::WalkDir;
use x509_cert::crl::CertificateList;
use x509_cert::Certificate;

use crate::{parse_cert, parse_crl, Error, PDVCertificate, PDVCrl, Result};

const PEM_BEGIN: &[u8] = b"-----BEGIN ";

/// `CertsAndCrls` collects the certificates and CRLs read from a buffer, file or folder.
#[derive(Clone, Debug, Default)]
pub struct CertsAndCrls {
    /// Certificates, in the order encountered
    pub certs: Vec<PDVCertificate>,
    /// CRLs, in the order encountered
    pub crls: Vec<PDVCrl>,
}

impl CertsAndCrls {
    /// Returns the total number of certificates and CRLs
    pub fn len(&self) -> usize {
        self.certs.len() + self.crls.len()
    }

    /// Returns true if no certificates or CRLs are present
    pub fn is_empty(&self) -> bool {
        self.certs.is_empty() && self.crls.is_empty()
    }

    fn append(&mut self, mut other: CertsAndCrls) {
        self.certs.append(&mut other.certs);
        self.crls.append(&mut other.crls);
    }
}

/// `get_file_as_byte_vec` takes a Path containing a file name and returns a vector of bytes containing
/// the contents of that file or an [Error::StdIoError].
pub fn get_file_as_byte_vec(filename: &Path) -> Result<Vec<u8>> {
    match std::fs::read(filename) {
        Ok(buffer) => Ok(buffer),
        Err(e) => Err(Error::StdIoError(e.kind())),
    }
}

/// `read_certs_and_crls_from_buffer` parses a buffer containing one or more PEM blocks or a single DER
/// encoded certificate or CRL. PEM blocks other than `CERTIFICATE` or `X509 CRL` are ignored, as is any
/// text between blocks.
///
/// [`Error::ParseError`] is returned if no certificates or CRLs could be read from the buffer.
pub fn read_certs_and_crls_from_buffer(buffer: &[u8], locator: &str) -> Result<CertsAndCrls> {
    let mut retval = CertsAndCrls::default();

    if buffer.windows(PEM_BEGIN.len()).any(|w| w == PEM_BEGIN) {
        for item in rustls_pemfile::read_all(&mut &*buffer) {
            match item {
                Ok(Item::X509Certificate(der_bytes)) => {
                    if let Ok(cert) = parse_cert(der_bytes.as_ref(), locator) {
                        retval.certs.push(cert);
                    }
                }
                Ok(Item::Crl(der_bytes)) => {
                    if let Ok(crl) = parse_crl(der_bytes.as_ref(), locator) {
                        retval.crls.push(crl);
                    }
                }
                Ok(_) => {
                    debug!("Ignoring PEM block that is not a certificate or CRL in {}", locator);
                }
                Err(e) => {
                    error!("Failed to decode PEM block from {}: {:?}", locator, e);
                    break;
                }
            }
        }
    } else if Certificate::from_der(buffer).is_ok() {
        retval.certs.push(parse_cert(buffer, locator)?);
    } else if CertificateList::from_der(buffer).is_ok() {
        retval.crls.push(parse_crl(buffer, locator)?);
    }

    if retval.is_empty() {
        error!("No certificates or CRLs could be read from {}", locator);
        return Err(Error::ParseError);
    }
    Ok(retval)
}

/// `read_certs_and_crls_from_file` reads a PEM or DER file and returns the certificates and CRLs it contains.
pub fn read_certs_and_crls_from_file(filename: &Path) -> Result<CertsAndCrls> {
    let buffer = get_file_as_byte_vec(filename)?;
    read_certs_and_crls_from_buffer(&buffer, &filename.to_string_lossy())
}

/// `read_certs_and_crls_from_folder` recursively traverses a folder and returns the certificates and CRLs
/// read from every file that could be parsed. Files that cannot be read or parsed are skipped.
///
/// [`Error::NotFound`] is returned if the folder does not exist or is not a directory.
pub fn read_certs_and_crls_from_folder(dir: &Path) -> Result<CertsAndCrls> {
    if !dir.is_dir() {
        error!("{} does not exist or is not a directory", dir.display());
        return Err(Error::NotFound);
    }

    let mut retval = CertsAndCrls::default();
    for entry in WalkDir::new(dir).follow_links(true) {
        match entry {
            Ok(e) => {
                if e.file_type().is_dir() {
                    continue;
                }
                if let Ok(items) = read_certs_and_crls_from_file(e.path()) {
                    retval.append(items);
                }
            }
            Err(e) => {
                error!("Failed to read entry in {}: {}", dir.display(), e);
                continue;
            }
        }
    }
    Ok(retval)
}

#[test]
fn non_existent_dir() {
    let r = read_certs_and_crls_from_folder(Path::new("tests/examples/nonexistent"));
    assert_eq!(Some(Error::NotFound), r.err());
}

#[test]
fn gibberish_buffer() {
    assert_eq!(
        Some(Error::ParseError),
        read_certs_and_crls_from_buffer(b"not a certificate", "gibberish").err()
    );
    assert_eq!(
        Some(Error::ParseError),
        read_certs_and_crls_from_buffer(&[0x30, 0x03, 0x02, 0x01, 0x01], "der").err()
    );
}

#[test]
fn mixed_pem_buffer() {
    let kp = rcgen::KeyPair::generate().unwrap();
    let mut params = rcgen::CertificateParams::default();
    params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
    params.key_usages = vec![
        rcgen::KeyUsagePurpose::KeyCertSign,
        rcgen::KeyUsagePurpose::CrlSign,
    ];
    let ca = params.self_signed(&kp).unwrap();

    let now = time::OffsetDateTime::now_utc();
    let crl = rcgen::CertificateRevocationListParams {
        this_update: now,
        next_update: now + time::Duration::hours(1),
        crl_number: rcgen::SerialNumber::from_slice(&[1]),
        issuing_distribution_point: None,
        revoked_certs: vec![],
        key_identifier_method: rcgen::KeyIdMethod::Sha256,
    }
    .signed_by(&ca, &kp)
    .unwrap();

    let pem = format!("{}\n{}\n{}", ca.pem(), crl.pem().unwrap(), ca.pem());
    let items = read_certs_and_crls_from_buffer(pem.as_bytes(), "mixed").unwrap();
    assert_eq!(2, items.certs.len());
    assert_eq!(1, items.crls.len());
    assert_eq!(3, items.len());
    assert_eq!(Some("mixed"), items.certs[0].locator());

    let der = read_certs_and_crls_from_buffer(crl.der(), "der").unwrap();
    assert_eq!(1, der.crls.len());
    assert!(der.certs.is_empty());
}

#[test]
fn pem_bundle_with_other_blocks() {
    let kp = rcgen::KeyPair::generate().unwrap();
    let mut params = rcgen::CertificateParams::default();
    params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
    let ca = params.self_signed(&kp).unwrap();

    // key blocks and free text between blocks are skipped
    let pem = format!(
        "# trust bundle\n{}\nsubject=CN=rcgen self signed cert\n{}",
        kp.serialize_pem(),
        ca.pem()
    );
    let items = read_certs_and_crls_from_buffer(pem.as_bytes(), "bundle").unwrap();
    assert_eq!(1, items.certs.len());
    assert!(items.crls.is_empty());
    assert_eq!(ca.der().to_vec(), items.certs[0].encoded_cert);

    // unterminated block
    let truncated = "-----BEGIN CERTIFICATE-----\nMIIB\n";
    assert_eq!(
        Some(Error::ParseError),
        read_certs_and_crls_from_buffer(truncated.as_bytes(), "truncated").err()
    );
}
