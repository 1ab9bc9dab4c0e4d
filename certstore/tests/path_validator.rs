use std::sync::Arc;

use certstore::*;

use store_utils::*;

fn environment(pool: &TrustPool) -> PkiEnvironment {
    let mut pe = PkiEnvironment::default();
    populate_default_pki_environment(&mut pe);
    pe.add_certificate_source(Box::new(pool.clone()));
    pe.add_crl_source(Box::new(pool.clone()));
    pe
}

fn build(
    pe: &PkiEnvironment,
    cps: &CertificationPathSettings,
    target: &PDVCertificate,
    extra: &[Arc<PDVCertificate>],
) -> (CertificationPath, CertificationPathResults) {
    let mut cp = CertificationPath::new(Arc::new(target.clone()));
    let mut cpr = CertificationPathResults::new();
    build_chain(pe, cps, extra, &mut cp, &mut cpr).unwrap();
    (cp, cpr)
}

#[test]
fn validate_three_tier_path() {
    let f = fixtures();
    let pool = TrustPool::new();
    pool.add_cert(Arc::new(f.ca1.pdv.clone()), true).unwrap();
    pool.add_cert(Arc::new(f.ca2.pdv.clone()), false).unwrap();
    let pe = environment(&pool);
    let cps = CertificationPathSettings::new();

    let (mut cp, mut cpr) = build(&pe, &cps, &f.ee1.pdv, &[]);
    assert_eq!(3, cp.len());
    assert!(pe.validate_path(&pe, &cps, &mut cp, &mut cpr).is_ok());
    assert_eq!(Some(PathValidationStatus::Ok), cpr.get_validation_status());
    assert!(cpr.get_crls_consulted().is_empty());
}

#[test]
fn individual_checks() {
    let f = fixtures();
    let pool = TrustPool::new();
    pool.add_cert(Arc::new(f.ca1.pdv.clone()), true).unwrap();
    let pe = environment(&pool);
    let mut cps = CertificationPathSettings::new();

    let (mut cp, mut cpr) = build(&pe, &cps, &f.ee3.pdv, &[Arc::new(f.ca2.pdv.clone())]);
    assert!(verify_signatures(&pe, &cps, &mut cp, &mut cpr).is_ok());
    assert!(check_basic_constraints(&pe, &cps, &mut cp, &mut cpr).is_ok());
    assert_eq!(
        Err(Error::PathValidation(PathValidationStatus::CertHasExpired)),
        check_validity(&pe, &cps, &mut cp, &mut cpr)
    );
    assert_eq!(0, cpr.get_error_depth());

    // the epoch is an ordinary time of interest
    cps.set_time_of_interest(0);
    let mut cpr = CertificationPathResults::new();
    assert_eq!(
        Err(Error::PathValidation(PathValidationStatus::CertNotYetValid)),
        check_validity(&pe, &cps, &mut cp, &mut cpr)
    );
    assert_eq!(0, cpr.get_error_depth());

    // inside the target's window but before the intermediate's
    cps.set_time_of_interest(f.now as u64 - 50);
    let mut cpr = CertificationPathResults::new();
    assert_eq!(
        Err(Error::PathValidation(PathValidationStatus::CertNotYetValid)),
        check_validity(&pe, &cps, &mut cp, &mut cpr)
    );
    assert_eq!(1, cpr.get_error_depth());
}

#[test]
fn signature_failure() {
    let f = fixtures();
    // same name and serial as ca2 but a different key, and a leaf without key identifiers
    let imposter = make_cert(CertProfile::ca("CA2", 2, f.now, f.now + 1800), Some(&f.ca1));
    let mut profile = CertProfile::ee("EE", 11, f.now, f.now + 1800);
    profile.aki = false;
    let ee = make_cert(profile, Some(&f.ca2));

    let pool = TrustPool::new();
    pool.add_cert(Arc::new(f.ca1.pdv.clone()), true).unwrap();
    let pe = environment(&pool);
    let cps = CertificationPathSettings::new();

    let (mut cp, mut cpr) = build(&pe, &cps, &ee.pdv, &[Arc::new(imposter.pdv.clone())]);
    assert_eq!(
        Err(Error::PathValidation(
            PathValidationStatus::CertSignatureFailure
        )),
        verify_signatures(&pe, &cps, &mut cp, &mut cpr)
    );
    assert_eq!(0, cpr.get_error_depth());

    let (mut cp, mut cpr) = build(&pe, &cps, &ee.pdv, &[Arc::new(f.ca2.pdv.clone())]);
    assert!(verify_signatures(&pe, &cps, &mut cp, &mut cpr).is_ok());
}

#[test]
fn no_validation_callbacks() {
    let f = fixtures();
    let pool = TrustPool::new();
    pool.add_cert(Arc::new(f.ca1.pdv.clone()), true).unwrap();
    let mut pe = environment(&pool);
    let cps = CertificationPathSettings::new();

    let (mut cp, mut cpr) = build(&pe, &cps, &f.ca1.pdv, &[]);
    pe.clear_validate_path_callbacks();
    assert_eq!(
        Err(Error::Unrecognized),
        pe.validate_path(&pe, &cps, &mut cp, &mut cpr)
    );
}

#[test]
fn signatures_and_validity_interleaved() {
    let f = fixtures();
    // named like ca2 but signed by an untrusted root named like ca1
    let rogue_root = make_cert(CertProfile::ca("CA1", 1, f.now, f.now + 3600), None);
    let mut profile = CertProfile::ca("CA2", 2, f.now, f.now + 1800);
    profile.aki = false;
    let rogue_ca2 = make_cert(profile, Some(&rogue_root));
    let expired = make_cert(
        CertProfile::ee("EE", 11, f.now - 100, f.now - 1),
        Some(&rogue_ca2),
    );

    let pool = TrustPool::new();
    pool.add_cert(Arc::new(f.ca1.pdv.clone()), true).unwrap();
    let pe = environment(&pool);
    let cps = CertificationPathSettings::new();

    let (mut cp, mut cpr) = build(&pe, &cps, &expired.pdv, &[Arc::new(rogue_ca2.pdv.clone())]);
    assert_eq!(3, cp.len());
    assert_eq!(
        Err(Error::PathValidation(
            PathValidationStatus::CertSignatureFailure
        )),
        verify_signatures(&pe, &cps, &mut cp, &mut cpr)
    );
    assert_eq!(1, cpr.get_error_depth());

    // the target's validity is evaluated before the signature above it
    let mut cpr = CertificationPathResults::new();
    assert_eq!(
        Err(Error::PathValidation(PathValidationStatus::CertHasExpired)),
        pe.validate_path(&pe, &cps, &mut cp, &mut cpr)
    );
    assert_eq!(0, cpr.get_error_depth());

    let current = make_cert(CertProfile::ee("EE", 12, f.now, f.now + 1800), Some(&rogue_ca2));
    let (mut cp, mut cpr) = build(&pe, &cps, &current.pdv, &[Arc::new(rogue_ca2.pdv.clone())]);
    assert_eq!(
        Err(Error::PathValidation(
            PathValidationStatus::CertSignatureFailure
        )),
        check_signatures_and_validity(&pe, &cps, &mut cp, &mut cpr)
    );
    assert_eq!(1, cpr.get_error_depth());

    let (mut cp, mut cpr) = build(&pe, &cps, &f.ee1.pdv, &[Arc::new(f.ca2.pdv.clone())]);
    assert!(check_signatures_and_validity(&pe, &cps, &mut cp, &mut cpr).is_ok());
}

#[test]
fn path_length_constraint() {
    let now = now();
    let mut root_profile = CertProfile::ca("Root", 1, now, now + 3600);
    root_profile.path_len = Some(0);
    let root = make_cert(root_profile, None);
    let sub = make_cert(CertProfile::ca("Sub", 2, now, now + 3600), Some(&root));
    let sub2 = make_cert(CertProfile::ca("Sub2", 3, now, now + 3600), Some(&sub));
    let leaf = make_cert(CertProfile::ee("Leaf", 4, now, now + 1800), Some(&sub2));
    let direct_leaf = make_cert(CertProfile::ee("Leaf", 5, now, now + 1800), Some(&sub));

    let pool = TrustPool::new();
    pool.add_cert(Arc::new(root.pdv.clone()), true).unwrap();
    let pe = environment(&pool);
    let cps = CertificationPathSettings::new();
    let extra = [Arc::new(sub.pdv.clone()), Arc::new(sub2.pdv.clone())];

    let (mut cp, mut cpr) = build(&pe, &cps, &leaf.pdv, &extra);
    assert_eq!(4, cp.len());
    assert_eq!(
        Err(Error::PathValidation(PathValidationStatus::PathLengthExceeded)),
        pe.validate_path(&pe, &cps, &mut cp, &mut cpr)
    );
    assert_eq!(3, cpr.get_error_depth());
    assert_eq!(25, PathValidationStatus::PathLengthExceeded.code());

    // a constraint of 0 admits no intermediates at all
    let (mut cp, mut cpr) = build(&pe, &cps, &direct_leaf.pdv, &extra);
    assert_eq!(3, cp.len());
    assert_eq!(
        Err(Error::PathValidation(PathValidationStatus::PathLengthExceeded)),
        check_basic_constraints(&pe, &cps, &mut cp, &mut cpr)
    );
    assert_eq!(2, cpr.get_error_depth());

    // the root may directly issue the leaf
    let root_leaf = make_cert(CertProfile::ee("Leaf", 6, now, now + 1800), Some(&root));
    let (mut cp, mut cpr) = build(&pe, &cps, &root_leaf.pdv, &[]);
    assert!(pe.validate_path(&pe, &cps, &mut cp, &mut cpr).is_ok());

    // a constraint of 1 admits a single intermediate
    let mut root_profile = CertProfile::ca("Root1", 7, now, now + 3600);
    root_profile.path_len = Some(1);
    let root1 = make_cert(root_profile, None);
    let sub1 = make_cert(CertProfile::ca("Sub1", 8, now, now + 3600), Some(&root1));
    let leaf1 = make_cert(CertProfile::ee("Leaf1", 9, now, now + 1800), Some(&sub1));
    pool.add_cert(Arc::new(root1.pdv.clone()), true).unwrap();
    let (mut cp, mut cpr) = build(&pe, &cps, &leaf1.pdv, &[Arc::new(sub1.pdv.clone())]);
    assert_eq!(3, cp.len());
    assert!(pe.validate_path(&pe, &cps, &mut cp, &mut cpr).is_ok());
}

#[test]
fn unhandled_critical_extension() {
    let f = fixtures();
    let mut profile = CertProfile::ee("EE", 12, f.now, f.now + 1800);
    profile.critical_oid = Some(&[1, 2, 3, 4]);
    let ee = make_cert(profile, Some(&f.ca2));

    let mut profile = CertProfile::ca("CA3", 3, f.now, f.now + 1800);
    profile.critical_oid = Some(&[1, 2, 3, 5]);
    let ca3 = make_cert(profile, Some(&f.ca1));
    let ee_under_ca3 = make_cert(CertProfile::ee("EE", 13, f.now, f.now + 1800), Some(&ca3));

    let pool = TrustPool::new();
    pool.add_cert(Arc::new(f.ca1.pdv.clone()), true).unwrap();
    let pe = environment(&pool);
    let cps = CertificationPathSettings::new();

    let (mut cp, mut cpr) = build(&pe, &cps, &ee.pdv, &[Arc::new(f.ca2.pdv.clone())]);
    assert_eq!(
        Err(Error::PathValidation(
            PathValidationStatus::UnhandledCriticalExtension
        )),
        pe.validate_path(&pe, &cps, &mut cp, &mut cpr)
    );
    assert_eq!(0, cpr.get_error_depth());
    assert_eq!(34, PathValidationStatus::UnhandledCriticalExtension.code());

    let (mut cp, mut cpr) = build(&pe, &cps, &ee_under_ca3.pdv, &[Arc::new(ca3.pdv.clone())]);
    assert_eq!(
        Err(Error::PathValidation(
            PathValidationStatus::UnhandledCriticalExtension
        )),
        check_critical_extensions(&pe, &cps, &mut cp, &mut cpr)
    );
    assert_eq!(1, cpr.get_error_depth());

    // critical basicConstraints and keyUsage are processed
    let (mut cp, mut cpr) = build(&pe, &cps, &f.ee1.pdv, &[Arc::new(f.ca2.pdv.clone())]);
    assert!(check_critical_extensions(&pe, &cps, &mut cp, &mut cpr).is_ok());
}
