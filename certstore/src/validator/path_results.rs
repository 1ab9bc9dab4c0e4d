//! Structures and functions related to results from certification path processing operations

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use pkiprocmacros::*;

use crate::PathValidationStatus;

/// `Buffers` is a typedef for a vector of `Vec<u8>` values.
pub type Buffers = Vec<Vec<u8>>;

/// `CertificationPathResultsTypes` is used to define a variant map with types associated with
/// the results of certification path discovery and validation.
#[derive(Clone, Debug)]
pub enum CertificationPathResultsTypes {
    /// Represents u8 values
    U8(u8),
    /// Represents vectors of buffers
    Buffers(Buffers),
    /// Represents validation result
    PathValidationStatus(PathValidationStatus),
}

/// `CertificationPathResults` is a typedef for a `BTreeMap` that maps arbitrary string values to a
/// variant map.
#[derive(Clone, Default, Debug)]
pub struct CertificationPathResults(pub BTreeMap<&'static str, CertificationPathResultsTypes>);

impl CertificationPathResults {
    /// Creates a new [`CertificationPathResults`]
    pub fn new() -> Self {
        Self(Default::default())
    }
}

/// `PR_VALIDATION_STATUS` is used to retrieve a status code indicating validation result.
pub static PR_VALIDATION_STATUS: &str = "cprValidationStatus";

/// `PR_ERROR_DEPTH` is used to retrieve the index, counting from the target, of the certificate that
/// caused validation to fail.
pub static PR_ERROR_DEPTH: &str = "cprErrorDepth";

/// `PR_CRLS_CONSULTED` is used to retrieve the encoded CRLs that were used to determine revocation status.
pub static PR_CRLS_CONSULTED: &str = "cprCrlsConsulted";

//-----------------------------------------------------------------------------------------------
// Getters/setters for results
//-----------------------------------------------------------------------------------------------
cpr_gets_and_sets!(PR_VALIDATION_STATUS, PathValidationStatus);
cpr_gets_and_sets_with_default!(PR_ERROR_DEPTH, u8, 0);
cpr_gets_and_sets_with_default!(PR_CRLS_CONSULTED, Buffers, Buffers::new());

impl CertificationPathResults {
    /// Appends an encoded CRL to the `PR_CRLS_CONSULTED` list
    pub fn add_crl_consulted(&mut self, crl: &[u8]) {
        let mut v = self.get_crls_consulted();
        v.push(crl.to_vec());
        self.set_crls_consulted(v);
    }
}

#[test]
fn test_results_gets_and_sets() {
    let mut cpr = CertificationPathResults::new();
    assert_eq!(None, cpr.get_validation_status());
    assert_eq!(0, cpr.get_error_depth());
    assert!(cpr.get_crls_consulted().is_empty());

    cpr.set_validation_status(PathValidationStatus::CertRevoked);
    cpr.set_error_depth(2);
    cpr.add_crl_consulted(&[1, 2, 3]);
    cpr.add_crl_consulted(&[4]);

    assert_eq!(
        Some(PathValidationStatus::CertRevoked),
        cpr.get_validation_status()
    );
    assert_eq!(2, cpr.get_error_depth());
    assert_eq!(vec![vec![1, 2, 3], vec![4]], cpr.get_crls_consulted());
}
