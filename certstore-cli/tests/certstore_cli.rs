use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use rcgen::{
    BasicConstraints, CertificateParams, CertificateRevocationListParams, DistinguishedName,
    DnType, IsCa, KeyIdMethod, KeyPair, KeyUsagePurpose, RevokedCertParams, SerialNumber,
};
use time::{Duration, OffsetDateTime};

struct Artifacts {
    _dir: tempfile::TempDir,
    ca1: PathBuf,
    ca2: PathBuf,
    ee1: PathBuf,
    ee2: PathBuf,
    crl2: PathBuf,
}

fn params(cn: &str, serial: u8, ca: bool) -> CertificateParams {
    let mut params = CertificateParams::default();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, cn);
    params.distinguished_name = dn;
    params.serial_number = Some(SerialNumber::from_slice(&[serial]));
    if ca {
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
    } else {
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
    }
    params.use_authority_key_identifier_extension = !ca || serial != 1;
    params
}

fn write(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let p = dir.join(name);
    std::fs::write(&p, contents).unwrap();
    p
}

fn artifacts() -> Artifacts {
    let dir = tempfile::tempdir().unwrap();

    let ca1_key = KeyPair::generate().unwrap();
    let ca1 = params("CA1", 1, true).self_signed(&ca1_key).unwrap();
    let ca2_key = KeyPair::generate().unwrap();
    let ca2 = params("CA2", 2, true)
        .signed_by(&ca2_key, &ca1, &ca1_key)
        .unwrap();
    let ee1_key = KeyPair::generate().unwrap();
    let ee1 = params("EE1", 10, false)
        .signed_by(&ee1_key, &ca2, &ca2_key)
        .unwrap();
    let ee2_key = KeyPair::generate().unwrap();
    let ee2 = params("EE2", 20, false)
        .signed_by(&ee2_key, &ca2, &ca2_key)
        .unwrap();

    let now = OffsetDateTime::now_utc();
    let crl2 = CertificateRevocationListParams {
        this_update: now - Duration::minutes(1),
        next_update: now + Duration::hours(1),
        crl_number: SerialNumber::from_slice(&[1]),
        issuing_distribution_point: None,
        revoked_certs: vec![RevokedCertParams {
            serial_number: SerialNumber::from_slice(&[20]),
            revocation_time: now - Duration::minutes(1),
            reason_code: None,
            invalidity_date: None,
        }],
        key_identifier_method: KeyIdMethod::Sha256,
    }
    .signed_by(&ca2, &ca2_key)
    .unwrap();

    Artifacts {
        ca1: write(dir.path(), "ca1.pem", ca1.pem().as_bytes()),
        ca2: write(dir.path(), "ca2.der", ca2.der()),
        ee1: write(dir.path(), "ee1.pem", ee1.pem().as_bytes()),
        ee2: write(dir.path(), "ee2.der", ee2.der()),
        crl2: write(dir.path(), "crl2.pem", crl2.pem().unwrap().as_bytes()),
        _dir: dir,
    }
}

#[test]
fn no_args_prints_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("certstore")?;
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
    Ok(())
}

#[test]
fn verify_ok() -> Result<(), Box<dyn std::error::Error>> {
    let a = artifacts();
    let mut cmd = Command::cargo_bin("certstore")?;
    cmd.arg("-a").arg(&a.ca1);
    cmd.arg("-c").arg(&a.ca2);
    cmd.arg("-t").arg(&a.ee1);
    cmd.assert().success().stdout(predicate::str::contains("ok"));
    Ok(())
}

#[test]
fn verify_missing_issuer() -> Result<(), Box<dyn std::error::Error>> {
    let a = artifacts();
    let mut cmd = Command::cargo_bin("certstore")?;
    cmd.arg("-a").arg(&a.ca1);
    cmd.arg("-t").arg(&a.ee1);
    cmd.assert().failure().stdout(predicate::str::contains(
        "error 20 at 0 depth lookup: unable to get local issuer certificate",
    ));
    Ok(())
}

#[test]
fn verify_revoked() -> Result<(), Box<dyn std::error::Error>> {
    let a = artifacts();
    {
        let mut cmd = Command::cargo_bin("certstore")?;
        cmd.arg("-a").arg(&a.ca1);
        cmd.arg("-c").arg(&a.ca2);
        cmd.arg("--crls").arg(&a.crl2);
        cmd.arg("-t").arg(&a.ee2);
        cmd.assert().success();
    }
    {
        let mut cmd = Command::cargo_bin("certstore")?;
        cmd.arg("-a").arg(&a.ca1);
        cmd.arg("-c").arg(&a.ca2);
        cmd.arg("--crls").arg(&a.crl2);
        cmd.arg("--crl-check");
        cmd.arg("-t").arg(&a.ee2);
        cmd.assert()
            .failure()
            .stdout(predicate::str::contains("certificate revoked"));
    }
    {
        let mut cmd = Command::cargo_bin("certstore")?;
        cmd.arg("-a").arg(&a.ca1);
        cmd.arg("-c").arg(&a.ca2);
        cmd.arg("--crls").arg(&a.crl2);
        cmd.arg("--crl-check-all");
        cmd.arg("-t").arg(&a.ee1);
        cmd.assert().success();
    }
    Ok(())
}

#[test]
fn verify_purpose_and_time() -> Result<(), Box<dyn std::error::Error>> {
    let a = artifacts();
    {
        let mut cmd = Command::cargo_bin("certstore")?;
        cmd.arg("-a").arg(&a.ca1);
        cmd.arg("-p").arg("ssl-client");
        cmd.arg("-t").arg(&a.ca2);
        cmd.assert()
            .failure()
            .stdout(predicate::str::contains("unsupported certificate purpose"));
    }
    {
        let mut cmd = Command::cargo_bin("certstore")?;
        cmd.arg("-a").arg(&a.ca1);
        cmd.arg("-p").arg("crl-sign");
        cmd.arg("-t").arg(&a.ca2);
        cmd.assert().success();
    }
    {
        let mut cmd = Command::cargo_bin("certstore")?;
        cmd.arg("-a").arg(&a.ca1);
        cmd.arg("-p").arg("bogus");
        cmd.arg("-t").arg(&a.ca2);
        cmd.assert().failure();
    }
    {
        let mut cmd = Command::cargo_bin("certstore")?;
        cmd.arg("-a").arg(&a.ca1);
        cmd.arg("-c").arg(&a.ca2);
        cmd.arg("-i").arg("1000");
        cmd.arg("-t").arg(&a.ee1);
        cmd.assert()
            .failure()
            .stdout(predicate::str::contains("certificate is not yet valid"));
    }
    Ok(())
}

#[test]
fn verify_bad_inputs() -> Result<(), Box<dyn std::error::Error>> {
    let a = artifacts();
    {
        let mut cmd = Command::cargo_bin("certstore")?;
        cmd.arg("-a").arg(&a.ca1);
        cmd.arg("-t").arg("does/not/exist.pem");
        cmd.assert().failure().stdout(predicate::str::contains("error"));
    }
    {
        let mut cmd = Command::cargo_bin("certstore")?;
        cmd.arg("-a").arg(&a.ca1);
        cmd.arg("-l").arg("does/not/exist.yaml");
        cmd.arg("-t").arg(&a.ca1);
        cmd.assert()
            .success()
            .stdout(predicate::str::contains("failed to configure logging"));
    }
    Ok(())
}
