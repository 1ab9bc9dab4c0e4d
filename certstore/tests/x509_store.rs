use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use certstore::*;
use rcgen::KeyUsagePurpose;

use store_utils::*;

fn store_with_ca1(f: &Fixtures) -> X509Store {
    let store = X509Store::new();
    store.add_cert(&f.ca1.pdv);
    store
}

#[test]
fn empty_store() {
    let f = fixtures();
    let store = X509Store::new();
    assert!(!store.verify(&f.ee1.pdv, &[]));
    assert_eq!(
        PathValidationStatus::UnableToGetIssuerCertLocally,
        store.error()
    );
    assert!(!store.verify(&f.ee1.pdv, &[f.ca2.pdv.clone()]));
    assert_eq!(
        PathValidationStatus::UnableToGetIssuerCertLocally,
        store.error()
    );
    assert_eq!(1, store.error_depth());
    assert!(!store.verify(&f.ee1.pdv, &[f.ca2.pdv.clone(), f.ca1.pdv.clone()]));
    assert_eq!(PathValidationStatus::SelfSignedCertInChain, store.error());
    assert_eq!(2, store.error_depth());
    assert!(!store.verify(&f.ca1.pdv, &[]));
    assert_eq!(PathValidationStatus::DepthZeroSelfSignedCert, store.error());
}

#[test]
fn self_signed_anchor() {
    let f = fixtures();
    let store = store_with_ca1(&f);
    assert!(store.verify(&f.ca1.pdv, &[]));
    assert_eq!(1, store.chain().len());
}

#[test]
fn three_tier_chain() {
    let f = fixtures();
    let store = store_with_ca1(&f);

    assert!(!store.verify(&f.ee2.pdv, &[]));
    assert_eq!(
        PathValidationStatus::UnableToGetIssuerCertLocally,
        store.error()
    );
    assert_eq!(0, store.error_depth());
    assert_eq!(20, store.error_code());
    assert_eq!("unable to get local issuer certificate", store.error_string());

    assert!(store.verify(&f.ee2.pdv, &[f.ca2.pdv.clone()]));
    assert_eq!(PathValidationStatus::Ok, store.error());
    let chain = store.chain();
    assert_eq!(3, chain.len());
    assert_eq!(f.ee2.pdv.encoded_cert, chain[0].encoded_cert);
    assert_eq!(f.ca2.pdv.encoded_cert, chain[1].encoded_cert);
    assert_eq!(f.ca1.pdv.encoded_cert, chain[2].encoded_cert);

    // extra certificates are not retained
    assert!(!store.verify(&f.ee2.pdv, &[]));
    assert_eq!(1, store.pool().anchor_count().unwrap());
}

#[test]
fn intermediate_anchor() {
    let f = fixtures();
    let store = X509Store::new();
    store.add_cert(&f.ca2.pdv);
    assert!(store.verify(&f.ee1.pdv, &[]));
    assert_eq!(2, store.chain().len());

    // path continues past a non-self-issued anchor when its issuer is available
    store.add_cert(&f.ca1.pdv);
    assert!(store.verify(&f.ee1.pdv, &[]));
    assert_eq!(3, store.chain().len());
}

#[test]
fn validity_periods() {
    let f = fixtures();
    let store = store_with_ca1(&f);
    let extra = [f.ca2.pdv.clone()];

    assert!(!store.verify(&f.ee3.pdv, &extra));
    assert_eq!(PathValidationStatus::CertHasExpired, store.error());
    assert_eq!(0, store.error_depth());

    assert!(!store.verify(&f.ee4.pdv, &extra));
    assert_eq!(PathValidationStatus::CertNotYetValid, store.error());

    store.set_time(Some((f.now + 1500) as u64));
    assert!(store.verify(&f.ee4.pdv, &extra));
    assert!(store.verify(&f.ee1.pdv, &extra));

    store.set_time(Some((f.now + 1900) as u64));
    assert!(!store.verify(&f.ee1.pdv, &extra));
    assert_eq!(PathValidationStatus::CertHasExpired, store.error());

    store.set_time(Some((f.now + 4000) as u64));
    assert!(!store.verify(&f.ee1.pdv, &extra));
    assert_eq!(PathValidationStatus::CertHasExpired, store.error());

    store.set_time(Some((f.now - 4000) as u64));
    assert!(!store.verify(&f.ee1.pdv, &extra));
    assert_eq!(PathValidationStatus::CertNotYetValid, store.error());

    store.set_time(None);
    assert!(store.verify(&f.ee1.pdv, &extra));
}

#[test]
fn trust_anchor_validity() {
    let f = fixtures();
    let store = X509Store::new();
    store.add_cert(&f.ca2.pdv);

    // ca2 expires before ee4
    store.set_time(Some((f.now + 1900) as u64));
    let mut cps = store.settings();

    let r = store.verify_with_result(&f.ee4.pdv, &[]);
    assert_eq!(PathValidationStatus::CertHasExpired, r.status);
    assert_eq!(1, r.error_depth);

    cps.set_enforce_trust_anchor_validity(false);
    store.set_settings(cps);
    assert!(store.verify(&f.ee4.pdv, &[]));
}

#[test]
fn purposes() {
    let f = fixtures();
    let store = store_with_ca1(&f);

    store.set_purpose(Purpose::SslClient);
    assert!(!store.verify(&f.ca2.pdv, &[]));
    assert_eq!(PathValidationStatus::InvalidPurpose, store.error());
    assert_eq!(0, store.error_depth());
    assert_eq!(26, store.error_code());

    store.set_purpose(Purpose::CrlSign);
    assert!(store.verify(&f.ca2.pdv, &[]));

    store.set_purpose(Purpose::SslServer);
    assert!(store.verify(&f.ee1.pdv, &[f.ca2.pdv.clone()]));

    store.set_purpose(Purpose::TimestampSign);
    assert!(!store.verify(&f.ee1.pdv, &[f.ca2.pdv.clone()]));
    assert_eq!(PathValidationStatus::InvalidPurpose, store.error());

    store.set_purpose(Purpose::Any);
    assert!(store.verify(&f.ca2.pdv, &[]));
}

#[test]
fn crl_check() {
    let f = fixtures();
    let store = store_with_ca1(&f);
    store.add_crl(&f.crl1).add_crl(&f.crl2);
    let extra = [f.ca2.pdv.clone()];

    // revocation is not checked unless requested
    assert!(store.verify(&f.ee2.pdv, &extra));

    store.set_flags(VerifyFlags::CrlCheck.into());
    assert!(store.verify(&f.ee1.pdv, &extra));
    assert!(!store.verify(&f.ee2.pdv, &extra));
    assert_eq!(PathValidationStatus::CertRevoked, store.error());
    assert_eq!(23, store.error_code());
    assert_eq!(0, store.error_depth());
    assert_eq!(3, store.chain().len());
}

#[test]
fn crl_check_all() {
    let f = fixtures();
    let store = store_with_ca1(&f);
    store.add_crl(&f.crl1_2).add_crl(&f.crl2);
    let extra = [f.ca2.pdv.clone()];

    store.set_flags(VerifyFlags::CrlCheck.into());
    assert!(store.verify(&f.ee1.pdv, &extra));

    store.set_flags(VerifyFlags::CrlCheck | VerifyFlags::CrlCheckAll);
    assert!(!store.verify(&f.ee1.pdv, &extra));
    assert_eq!(PathValidationStatus::CertRevoked, store.error());
    assert_eq!(1, store.error_depth());

    // CrlCheckAll alone has no effect
    store.set_flags(VerifyFlags::CrlCheckAll.into());
    assert!(store.verify(&f.ee1.pdv, &extra));
}

#[test]
fn expired_crl() {
    let f = fixtures();
    let store = store_with_ca1(&f);
    store.add_crl(&f.crl2_2);
    store.set_flags(VerifyFlags::CrlCheck.into());

    assert!(!store.verify(&f.ee1.pdv, &[f.ca2.pdv.clone()]));
    assert_eq!(PathValidationStatus::CrlHasExpired, store.error());
    assert_eq!("CRL has expired", store.error_string());

    // a current CRL is preferred over an expired one
    store.add_crl(&f.crl2);
    assert!(store.verify(&f.ee1.pdv, &[f.ca2.pdv.clone()]));
}

#[test]
fn crl_from_wrong_issuer_key() {
    let f = fixtures();
    // same name as ca2, different key
    let imposter = make_cert(CertProfile::ca("CA2", 3, f.now, f.now + 1800), Some(&f.ca1));
    let crl = make_crl(&imposter, &[], f.now, f.now + 1800);

    let store = store_with_ca1(&f);
    store.add_crl(&crl);
    store.set_flags(VerifyFlags::CrlCheck.into());
    assert!(!store.verify(&f.ee1.pdv, &[f.ca2.pdv.clone()]));
    assert_eq!(PathValidationStatus::CrlSignatureFailure, store.error());
}

#[test]
fn same_subject_issuers() {
    let f = fixtures();
    let ca2b = make_cert(CertProfile::ca("CA2", 4, f.now, f.now + 1800), Some(&f.ca1));
    let ee = make_cert(CertProfile::ee("EE5", 50, f.now, f.now + 1800), Some(&ca2b));

    let store = store_with_ca1(&f);
    let extra = [f.ca2.pdv.clone(), ca2b.pdv.clone()];
    let first = store.verify_with_result(&ee.pdv, &extra);
    assert!(first.valid);
    assert_eq!(ca2b.pdv.encoded_cert, first.chain[1].encoded_cert);
    for _ in 0..10 {
        assert_eq!(first, store.verify_with_result(&ee.pdv, &extra));
    }

    // without key identifiers the first time-valid candidate is selected
    let mut profile = CertProfile::ee("EE6", 60, f.now, f.now + 1800);
    profile.aki = false;
    let ee_no_aki = make_cert(profile, Some(&ca2b));
    let first = store.verify_with_result(&ee_no_aki.pdv, &extra);
    assert_eq!(PathValidationStatus::CertSignatureFailure, first.status);
    assert_eq!(0, first.error_depth);
    for _ in 0..10 {
        assert_eq!(first, store.verify_with_result(&ee_no_aki.pdv, &extra));
    }
    let reordered = [ca2b.pdv.clone(), f.ca2.pdv.clone()];
    assert!(store.verify(&ee_no_aki.pdv, &reordered));
}

#[test]
fn non_ca_issuer() {
    let f = fixtures();
    let mut profile = CertProfile::ee("NotCA", 5, f.now, f.now + 1800);
    profile.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
    let not_ca = make_cert(profile, Some(&f.ca1));
    let ee = make_cert(CertProfile::ee("EE7", 70, f.now, f.now + 1800), Some(&not_ca));

    let store = store_with_ca1(&f);
    assert!(!store.verify(&ee.pdv, &[not_ca.pdv.clone()]));
    assert_eq!(PathValidationStatus::InvalidCa, store.error());
    assert_eq!(1, store.error_depth());
}

#[test]
fn duplicate_add_cert() {
    let f = fixtures();
    let store = X509Store::new();
    for _ in 0..5 {
        store.add_cert(&f.ca1.pdv);
    }
    store.add_cert(&f.ca2.pdv);
    assert_eq!(6, store.pool().anchor_count().unwrap());
    assert_eq!(
        5,
        store.pool().lookup_anchors(f.ca1.pdv.subject()).unwrap().len()
    );
    assert_eq!(
        1,
        store.pool().lookup_anchors(f.ca2.pdv.subject()).unwrap().len()
    );
    assert!(store.verify(&f.ee1.pdv, &[]));
    assert_eq!(3, store.chain().len());
}

#[test]
fn verify_encoded() {
    let f = fixtures();
    let store = store_with_ca1(&f);
    assert!(store.verify_encoded(b"not a certificate", &[]).is_err());
    assert!(store.verify_encoded(&f.crl1.encoded_crl, &[]).is_err());
    assert_eq!(
        Ok(true),
        store.verify_encoded(&f.ee1.pdv.encoded_cert, &[f.ca2.pdv.clone()])
    );
}

fn accept_expired(_ok: bool, r: &VerificationResult) -> bool {
    r.status == PathValidationStatus::CertHasExpired
}

#[test]
fn verify_callback() {
    let f = fixtures();
    let store = store_with_ca1(&f);
    let extra = [f.ca2.pdv.clone()];
    store.set_verify_callback(Some(accept_expired));

    assert!(store.verify(&f.ee3.pdv, &extra));
    assert_eq!(PathValidationStatus::Ok, store.error());

    assert!(!store.verify(&f.ee4.pdv, &extra));
    assert_eq!(PathValidationStatus::CertNotYetValid, store.error());

    store.set_verify_callback(None);
    assert!(!store.verify(&f.ee3.pdv, &extra));
}

#[test]
fn add_file_pem_and_der() {
    let f = fixtures();
    let dir = tempfile::tempdir().unwrap();

    let pem_path = dir.path().join("bundle.pem");
    let mut pem = std::fs::File::create(&pem_path).unwrap();
    writeln!(pem, "{}", f.ca1.cert.pem()).unwrap();
    writeln!(pem, "{}", f.ca2.cert.pem()).unwrap();
    drop(pem);

    let der_path = dir.path().join("crl.der");
    std::fs::write(&der_path, &f.crl2.encoded_crl).unwrap();

    let store = X509Store::new();
    assert_eq!(2, store.add_file(&pem_path).unwrap());
    assert_eq!(1, store.add_file(&der_path).unwrap());
    assert_eq!(2, store.pool().anchor_count().unwrap());
    assert_eq!(1, store.pool().crl_count().unwrap());

    let garbage = dir.path().join("garbage.pem");
    std::fs::write(&garbage, b"garbage").unwrap();
    assert_eq!(Err(Error::ParseError), store.add_file(&garbage));
    assert!(store.add_file(&dir.path().join("missing.pem")).is_err());

    store.set_flags(VerifyFlags::CrlCheck.into());
    assert!(store.verify(&f.ee1.pdv, &[]));
    assert!(!store.verify(&f.ee2.pdv, &[]));
    assert_eq!(PathValidationStatus::CertRevoked, store.error());
}

#[test]
fn concurrent_adds() {
    let f = fixtures();
    let dir = tempfile::tempdir().unwrap();
    let threads = 8;
    let per_thread = 4;

    let mut files = vec![];
    let mut certs = vec![];
    for t in 0..threads {
        let mut pem = String::new();
        for i in 0..per_thread {
            let cn = format!("Thread {} CA {}", t, i);
            let c = make_cert(CertProfile::ca(&cn, 100, f.now, f.now + 3600), None);
            pem.push_str(&c.cert.pem());
            certs.push(c.pdv);
        }
        let path: PathBuf = dir.path().join(format!("{}.pem", t));
        std::fs::write(&path, pem).unwrap();
        files.push(path);
    }

    let store = Arc::new(X509Store::new());
    let mut handles = vec![];
    for path in files {
        let store = store.clone();
        let ca1 = f.ca1.pdv.clone();
        handles.push(thread::spawn(move || {
            store.add_file(&path).unwrap();
            store.add_cert(&ca1);
            store.verify(&ca1, &[])
        }));
    }
    for h in handles {
        assert!(h.join().unwrap());
    }

    assert_eq!(
        threads * per_thread + threads,
        store.pool().anchor_count().unwrap()
    );
    for c in &certs {
        let found = store.pool().lookup_anchors(c.subject()).unwrap();
        assert_eq!(1, found.len());
        assert!(store.verify(c, &[]));
    }
}
