use std::env;
use std::sync::Mutex;

use certstore::*;
use lazy_static::lazy_static;

use store_utils::*;

lazy_static! {
    // environment variables are process-wide
    static ref TEST_MUTEX: Mutex<()> = Mutex::new(());
}

#[test]
fn missing_default_paths() {
    let _guard = TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    env::set_var(SSL_CERT_FILE_ENV, dir.path().join("missing.pem"));
    env::set_var(SSL_CERT_DIR_ENV, dir.path().join("missing"));

    let store = X509Store::new();
    assert_eq!(0, store.set_default_paths());
    assert_eq!(0, store.pool().anchor_count().unwrap());
}

#[test]
fn gibberish_default_paths() {
    let _guard = TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("gibberish.pem");
    std::fs::write(&file, b"-----BEGIN CERTIFICATE-----\ngibberish\n-----END CERTIFICATE-----\n")
        .unwrap();
    let certs = dir.path().join("certs");
    std::fs::create_dir(&certs).unwrap();
    std::fs::write(certs.join("gibberish.0"), b"gibberish").unwrap();

    env::set_var(SSL_CERT_FILE_ENV, &file);
    env::set_var(SSL_CERT_DIR_ENV, &certs);

    let store = X509Store::new();
    assert_eq!(0, store.set_default_paths());
}

#[test]
fn populated_default_paths() {
    let _guard = TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let f = fixtures();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("cert.pem");
    std::fs::write(&file, f.ca1.cert.pem()).unwrap();

    let certs = dir.path().join("certs");
    std::fs::create_dir_all(certs.join("nested")).unwrap();
    std::fs::write(certs.join("ca2.der"), &f.ca2.pdv.encoded_cert).unwrap();
    std::fs::write(certs.join("nested").join("crl2.pem"), pem_rfc7468::encode_string(
        "X509 CRL",
        pem_rfc7468::LineEnding::LF,
        &f.crl2.encoded_crl,
    )
    .unwrap())
    .unwrap();
    std::fs::write(certs.join("readme.txt"), b"not a certificate").unwrap();

    env::set_var(SSL_CERT_FILE_ENV, &file);
    env::set_var(SSL_CERT_DIR_ENV, &certs);

    let store = X509Store::new();
    assert_eq!(3, store.set_default_paths());
    assert_eq!(2, store.pool().anchor_count().unwrap());
    assert_eq!(1, store.pool().crl_count().unwrap());

    store.set_flags(VerifyFlags::CrlCheck.into());
    assert!(store.verify(&f.ee1.pdv, &[]));
    assert!(!store.verify(&f.ee2.pdv, &[]));
    assert_eq!(PathValidationStatus::CertRevoked, store.error());
}
