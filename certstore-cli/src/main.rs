#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

mod cliargs;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use log::{debug, error, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use certstore::{
    read_certs_and_crls_from_file, read_settings, Error, PDVCertificate, Result, VerifyFlags,
    X509Store,
};

use crate::cliargs::CertstoreArgs;

fn configure_logging(args: &CertstoreArgs) {
    if let Some(logging_config) = &args.logging_config {
        if let Err(e) = log4rs::init_file(logging_config, Default::default()) {
            println!(
                "ERROR: failed to configure logging using {} with {:?}. Continuing without logging.",
                logging_config, e
            );
        } else {
            return;
        }
    }

    // if there's no config, prepare one using stdout
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{m}{n}")))
        .build();
    match Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))
    {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                println!(
                    "ERROR: failed to configure logging for stdout with {:?}. Continuing without logging.",
                    e
                );
            }
        }
        Err(e) => {
            println!(
                "ERROR: failed to prepare default logging configuration with {:?}. Continuing without logging",
                e
            );
        }
    }
}

/// Prepares an [`X509Store`] per the command line arguments
fn prepare_store(args: &CertstoreArgs) -> Result<X509Store> {
    let store = X509Store::new();

    let mut cps = read_settings(&args.settings)?;
    if let Some(purpose) = args.purpose {
        cps.set_purpose(purpose);
    }
    if let Some(toi) = args.time_of_interest {
        cps.set_time_of_interest(toi);
    }
    let mut flags = cps.get_verify_flags_as_set();
    if args.crl_check || args.crl_check_all {
        flags |= VerifyFlags::CrlCheck;
    }
    if args.crl_check_all {
        flags |= VerifyFlags::CrlCheckAll;
    }
    cps.set_verify_flags_from_set(flags);
    store.set_settings(cps);

    if args.default_paths {
        store.set_default_paths();
    }
    for anchors in &args.anchors {
        let count = store.add_file(Path::new(anchors))?;
        debug!("Read {} trust anchor(s) from {}", count, anchors);
    }
    for crls in &args.crls {
        for crl in read_certs_and_crls_from_file(Path::new(crls))?.crls {
            store.add_crl(&crl);
        }
    }
    Ok(store)
}

/// Reads the certificates from each of the named files
fn read_certs(files: &[String]) -> Result<Vec<PDVCertificate>> {
    let mut retval = vec![];
    for f in files {
        retval.extend(read_certs_and_crls_from_file(Path::new(f))?.certs);
    }
    Ok(retval)
}

fn verify(args: &CertstoreArgs) -> Result<bool> {
    let target_file = match &args.target {
        Some(t) => t,
        None => {
            error!("target argument must be provided");
            return Err(Error::NotFound);
        }
    };
    let target = match read_certs(&[target_file.clone()])?.into_iter().next() {
        Some(t) => t,
        None => {
            error!("{} does not contain a certificate", target_file);
            return Err(Error::NotFound);
        }
    };

    let store = prepare_store(args)?;
    let extra = read_certs(&args.ca_certs)?;

    let result = store.verify_with_result(&target, &extra);
    if result.valid {
        println!("ok");
    } else {
        println!(
            "error {} at {} depth lookup: {}",
            result.error_code(),
            result.error_depth,
            result.error_string()
        );
    }
    Ok(result.valid)
}

/// Point of entry for the certstore application.
fn main() -> ExitCode {
    let args = CertstoreArgs::parse();
    configure_logging(&args);

    match verify(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            println!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
