//! Structures and functions related to configuring certification path processing operations

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use flagset::{flags, FlagSet};
use serde::{Deserialize, Serialize};
use serde_json::Result as SerdeResult;

use pkiprocmacros::*;

use crate::builder::file_utils::get_file_as_byte_vec;
use crate::purpose::Purpose;
use crate::{Error, Result};

/// `CertificationPathSettings` is a typedef for a `BTreeMap` that maps arbitrary string values to a
/// variant map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationPathSettings(pub BTreeMap<String, CertificationPathProcessingTypes>);

impl CertificationPathSettings {
    /// Creates a new empty [`CertificationPathSettings`]
    pub fn new() -> Self {
        Self::default()
    }
}

flags! {
    /// `VerifyFlags` enumerates the flags that may be set via `PS_VERIFY_FLAGS`. Values match the
    /// corresponding OpenSSL `X509_V_FLAG_*` constants.
    pub enum VerifyFlags: u32 {
        /// Check revocation status of the target certificate using available CRLs
        CrlCheck = 0x4,
        /// Check revocation status of every certificate in the path. Only meaningful alongside CrlCheck.
        CrlCheckAll = 0x8,
    }
}

/// `CertificationPathProcessingTypes` is used to define a variant map with types associated with
/// performing certification path discovery and validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificationPathProcessingTypes {
    /// Represents bool values
    Bool(bool),
    /// Represents u8 values
    U8(u8),
    /// Represents u32 values
    U32(u32),
    /// Represents u64 values
    U64(u64),
    /// Represents Purpose values
    Purpose(Purpose),
}

//-----------------------------------------------------------------------------------------------
// Types of path settings
//-----------------------------------------------------------------------------------------------
/// `PS_TIME_OF_INTEREST` is used to retrieve a Time value from a [`CertificationPathSettings`]
/// object. The value need not be current data/time and can be a time in the past to support retrospective
/// validation. The value is expressed as a u64 containing seconds since Unix epoch (i.e., 1970-01-01T00:00:00Z).
/// When absent, the current time is returned. Every value, including 0, is compared against validity
/// periods.
pub static PS_TIME_OF_INTEREST: &str = "psTimeOfInterest";

/// `PS_ENFORCE_TRUST_ANCHOR_VALIDITY` is used to retrieve a boolean value from a [`CertificationPathSettings`]
/// object. By default, this setting is set to true (per industry convention, RFC5280 does not
/// require checking trust anchor (TA) validity. Turn this value off to refrain from checking TA validity.
pub static PS_ENFORCE_TRUST_ANCHOR_VALIDITY: &str = "psEnforceTrustAnchorValidity";

/// `PS_PURPOSE` is used to retrieve a [`Purpose`] value from a [`CertificationPathSettings`] object.
/// The target certificate is evaluated against the purpose. By default, [`Purpose::Any`] is used.
pub static PS_PURPOSE: &str = "psPurpose";

/// `PS_VERIFY_FLAGS` is used to retrieve a u32 value containing [`VerifyFlags`] bits from a
/// [`CertificationPathSettings`] object. By default, no flags are set.
pub static PS_VERIFY_FLAGS: &str = "psVerifyFlags";

/// `PS_MAX_CHAIN_LENGTH` is used to retrieve a u8 value from a [`CertificationPathSettings`] object
/// that limits the number of certificates in a certification path, inclusive of target and trust anchor.
/// By default, the value is set to [`PS_MAX_CHAIN_LENGTH_DEFAULT`].
pub static PS_MAX_CHAIN_LENGTH: &str = "psMaxChainLength";

/// `PS_MAX_CHAIN_LENGTH_DEFAULT` is the default maximum number of certificates in a certification path
pub static PS_MAX_CHAIN_LENGTH_DEFAULT: u8 = 32;

//-----------------------------------------------------------------------------------------------
// Getters/setters for settings
//-----------------------------------------------------------------------------------------------
cps_gets_and_sets_with_default!(PS_TIME_OF_INTEREST, u64, {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(n) => n.as_secs(),
        Err(_) => 0,
    }
});
cps_gets_and_sets_with_default!(PS_ENFORCE_TRUST_ANCHOR_VALIDITY, bool, true);
cps_gets_and_sets_with_default!(PS_PURPOSE, Purpose, Purpose::Any);
cps_gets_and_sets_with_default!(PS_VERIFY_FLAGS, u32, 0);
cps_gets_and_sets_with_default!(PS_MAX_CHAIN_LENGTH, u8, PS_MAX_CHAIN_LENGTH_DEFAULT);

impl CertificationPathSettings {
    /// `clear_time_of_interest` removes `PS_TIME_OF_INTEREST` so that the current time is used.
    pub fn clear_time_of_interest(&mut self) {
        self.0.remove(PS_TIME_OF_INTEREST);
    }

    /// `get_verify_flags_as_set` returns the `PS_VERIFY_FLAGS` value as a set of [`VerifyFlags`]. Unknown
    /// bits are discarded.
    pub fn get_verify_flags_as_set(&self) -> FlagSet<VerifyFlags> {
        FlagSet::<VerifyFlags>::new_truncated(self.get_verify_flags())
    }

    /// `set_verify_flags_from_set` sets the `PS_VERIFY_FLAGS` value from a set of [`VerifyFlags`].
    pub fn set_verify_flags_from_set(&mut self, flags: FlagSet<VerifyFlags>) {
        self.set_verify_flags(flags.bits());
    }

    /// Returns true if revocation status should be checked for the target certificate.
    pub fn crl_check(&self) -> bool {
        self.get_verify_flags_as_set().contains(VerifyFlags::CrlCheck)
    }

    /// Returns true if revocation status should be checked for every certificate in the path.
    pub fn crl_check_all(&self) -> bool {
        let flags = self.get_verify_flags_as_set();
        flags.contains(VerifyFlags::CrlCheck) && flags.contains(VerifyFlags::CrlCheckAll)
    }
}

/// `read_settings` accepts a string containing the name of a file that notionally contains JSON data that
/// represents CertificationPathSettings.
///
/// If no file name is provided or the file does not exist, default settings are returned. A file that
/// cannot be parsed yields [`Error::ParseError`].
pub fn read_settings(fname: &Option<String>) -> Result<CertificationPathSettings> {
    if let Some(fname) = fname {
        let p = Path::new(fname.as_str());
        if Path::exists(p) {
            if let Ok(json) = get_file_as_byte_vec(p) {
                let r: SerdeResult<CertificationPathSettings> = serde_json::from_slice(&json);
                match r {
                    Ok(cps) => {
                        return Ok(cps);
                    }
                    Err(_e) => return Err(Error::ParseError),
                };
            }
        }
    }
    Ok(CertificationPathSettings::new())
}

#[test]
fn test_default_gets_cps() {
    let cps = CertificationPathSettings::default();

    let before = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
    assert!(cps.get_time_of_interest() >= before.as_secs());
    assert!(cps.get_enforce_trust_anchor_validity());
    assert_eq!(Purpose::Any, cps.get_purpose());
    assert_eq!(0, cps.get_verify_flags());
    assert!(cps.get_verify_flags_as_set().is_empty());
    assert_eq!(32, cps.get_max_chain_length());
    assert!(!cps.crl_check());
    assert!(!cps.crl_check_all());
}

#[test]
fn test_default_sets_cps() {
    let mut cps = CertificationPathSettings::default();

    cps.set_time_of_interest(1);
    assert_eq!(cps.get_time_of_interest(), 1);
    cps.clear_time_of_interest();
    assert!(cps.get_time_of_interest() > 1);

    cps.set_enforce_trust_anchor_validity(false);
    assert!(!cps.get_enforce_trust_anchor_validity());
    cps.set_purpose(Purpose::SslServer);
    assert_eq!(Purpose::SslServer, cps.get_purpose());
    cps.set_max_chain_length(4);
    assert_eq!(4, cps.get_max_chain_length());

    cps.set_verify_flags_from_set(VerifyFlags::CrlCheckAll.into());
    assert!(!cps.crl_check());
    assert!(!cps.crl_check_all());
    cps.set_verify_flags_from_set(VerifyFlags::CrlCheck | VerifyFlags::CrlCheckAll);
    assert_eq!(0xC, cps.get_verify_flags());
    assert!(cps.crl_check());
    assert!(cps.crl_check_all());

    // unknown bits are dropped
    cps.set_verify_flags(0x4 | 0x100);
    assert_eq!(
        FlagSet::from(VerifyFlags::CrlCheck),
        cps.get_verify_flags_as_set()
    );
}

#[test]
fn test_settings_serialization() {
    let mut cps = CertificationPathSettings::default();
    cps.set_time_of_interest(1_700_000_000);
    cps.set_purpose(Purpose::SmimeSign);
    cps.set_verify_flags_from_set(VerifyFlags::CrlCheck.into());
    cps.set_max_chain_length(5);
    cps.set_enforce_trust_anchor_validity(false);

    let json = serde_json::to_string(&cps).unwrap();
    let cps2: CertificationPathSettings = serde_json::from_str(&json).unwrap();
    assert_eq!(cps, cps2);
    assert_eq!(Purpose::SmimeSign, cps2.get_purpose());
    assert_eq!(1_700_000_000, cps2.get_time_of_interest());
}

#[test]
fn test_read_settings() {
    use std::io::Write;

    assert_eq!(
        CertificationPathSettings::new(),
        read_settings(&None).unwrap()
    );
    assert_eq!(
        CertificationPathSettings::new(),
        read_settings(&Some("/does/not/exist.json".to_string())).unwrap()
    );

    let mut cps = CertificationPathSettings::default();
    cps.set_purpose(Purpose::CrlSign);
    let mut good = tempfile::NamedTempFile::new().unwrap();
    good.write_all(serde_json::to_string(&cps).unwrap().as_bytes())
        .unwrap();
    let fname = good.path().to_str().unwrap().to_string();
    assert_eq!(cps, read_settings(&Some(fname)).unwrap());

    let mut bad = tempfile::NamedTempFile::new().unwrap();
    bad.write_all(b"{not json").unwrap();
    let fname = bad.path().to_str().unwrap().to_string();
    assert_eq!(Some(Error::ParseError), read_settings(&Some(fname)).err());
}
