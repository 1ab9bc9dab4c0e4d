//! Arguments for the certstore utility

use clap::Parser;
use serde::{Deserialize, Serialize};

use certstore::Purpose;

/// Verifies a certificate against a set of trust anchors, intermediate CA certificates and CRLs
#[derive(Parser, Debug, Serialize, Deserialize, Default)]
#[command(arg_required_else_help(true))]
#[clap(author, version, about, long_about = None)]
pub struct CertstoreArgs {
    /// Full path and filename of a PEM or DER file containing trust anchors. May be repeated.
    #[clap(short, long, help_heading = "COMMON OPTIONS")]
    pub anchors: Vec<String>,

    /// Full path and filename of a PEM or DER file containing intermediate CA certificates to use when
    /// building a path. These are not trusted. May be repeated.
    #[clap(short, long, help_heading = "COMMON OPTIONS")]
    pub ca_certs: Vec<String>,

    /// Full path and filename of a PEM or DER file containing CRLs. May be repeated.
    #[clap(long, help_heading = "COMMON OPTIONS")]
    pub crls: Vec<String>,

    /// Load trust anchors from SSL_CERT_FILE and SSL_CERT_DIR or the platform defaults
    #[clap(long, help_heading = "COMMON OPTIONS")]
    pub default_paths: bool,

    /// Full path and filename of YAML-formatted configuration file for log4rs logging mechanism.
    /// See <https://docs.rs/log4rs/latest/log4rs/> for details.
    #[clap(short, long, help_heading = "COMMON OPTIONS")]
    pub logging_config: Option<String>,

    /// Full path and filename of JSON-formatted certification path settings. Options below override
    /// values read from this file.
    #[clap(short, long, help_heading = "VALIDATION")]
    pub settings: Option<String>,

    /// Full path and filename of a PEM or DER certificate to verify
    #[clap(short, long, help_heading = "VALIDATION")]
    pub target: Option<String>,

    /// Check revocation status of the target certificate using available CRLs
    #[clap(long, help_heading = "VALIDATION")]
    pub crl_check: bool,

    /// Check revocation status of every certificate in the path using available CRLs
    #[clap(long, help_heading = "VALIDATION")]
    pub crl_check_all: bool,

    /// Purpose the target certificate must satisfy, i.e., any, ssl-client, ssl-server, smime-sign,
    /// smime-encrypt, crl-sign or timestamp-sign
    #[clap(short, long, help_heading = "VALIDATION")]
    pub purpose: Option<Purpose>,

    /// Time to use for path validation expressed as the number of seconds since Unix epoch
    /// (defaults to current system time).
    #[clap(short = 'i', long, help_heading = "VALIDATION")]
    pub time_of_interest: Option<u64>,
}
