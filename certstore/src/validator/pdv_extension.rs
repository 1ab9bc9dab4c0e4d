//! Wrappers around asn.1 encoder/decoder structures to support certification path processing

use alloc::collections::BTreeMap;

use der::asn1::ObjectIdentifier;
use x509_cert::ext::pkix::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectKeyIdentifier,
};

use crate::util::error::*;

/// The [`ExtensionProcessing`] trait provides a common means of extracting extensions from objects that
/// feature extensions and that retain copies of the decoded extension structures, like `PDVCertificate`.
///
/// Prior to building and validating paths, the parse_extensions method should be used to parse the
/// extensions that will be consulted. The decoded extensions are cached and accessed via get_extension.
pub trait ExtensionProcessing {
    /// `get_extension` takes an ObjectIdentifier that identifies an extension type and returns
    /// a previously parsed PDVExtension instance containing the decoded extension if the extension was present.
    fn get_extension(&self, oid: &ObjectIdentifier) -> Result<Option<&'_ PDVExtension>>;

    /// `parse_extension` takes an ObjectIdentifier that identifies an extension type and returns
    /// a `PDVExtension` containing the decoded extension if the extension was present.
    fn parse_extension(&'_ mut self, oid: &ObjectIdentifier) -> Result<Option<&'_ PDVExtension>>;

    /// `parse_extensions` parses each of the extensions identified in `oids`, ignoring failures.
    fn parse_extensions(&'_ mut self, oids: &[ObjectIdentifier]);
}

/// [`ParsedExtensions`] is a typedef of a BTreeMap map that associates [`PDVExtension`] objects with object
/// identifier values. This is used to avoid parsing extensions repeatedly when performing certification
/// path processing.
pub type ParsedExtensions = BTreeMap<ObjectIdentifier, PDVExtension>;

/// [`PDVExtension`] provides a wrapper for the extension types consulted while building and validating paths.
#[derive(PartialEq, Clone, Eq, Debug)]
pub enum PDVExtension {
    /// Parsed BasicConstraints extension
    BasicConstraints(BasicConstraints),
    /// Parsed SubjectKeyIdentifier extension
    SubjectKeyIdentifier(SubjectKeyIdentifier),
    /// Parsed ExtendedKeyUsage extension
    ExtendedKeyUsage(ExtendedKeyUsage),
    /// Parsed KeyUsage extension
    KeyUsage(KeyUsage),
    /// Parsed AuthorityKeyIdentifier extension
    AuthorityKeyIdentifier(AuthorityKeyIdentifier),
}
