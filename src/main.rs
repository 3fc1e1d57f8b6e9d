//! Frequency domain command-line tool
//!
//! ```text
//! cml-domain add <id> <key>...     record one event per key (creates the domain)
//! cml-domain freq <id> <key>...    estimated count per key
//! cml-domain count <id>            total events recorded
//! cml-domain clear <id>            discard all events
//! cml-domain destroy <id>          delete the domain's records
//! cml-domain list                  list stored domains
//! ```
//!
//! Directories and save threshold come from `SKZ_*` variables; see
//! `cml_domain::config`.

use cml_domain::observability::init_tracing;
use cml_domain::storage::StorageError;
use cml_domain::{
    Config, Counter, DomainError, DomainOptions, DomainType, FrequencyDomain, Info,
    LocalFsStorage, Storage,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

const USAGE: &str = "usage: cml-domain <add|freq|count|clear|destroy> <id> [key...] | cml-domain list";

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    config.ensure_dirs()?;
    let storage: Arc<dyn Storage> =
        Arc::new(LocalFsStorage::new(&config.info_dir, &config.data_dir)?);
    let options = DomainOptions::from_config(&config);

    let (command, rest) = args.split_first().ok_or(USAGE)?;
    if command == "list" {
        for id in storage.list()? {
            println!("{}", id);
        }
        return Ok(());
    }

    let (id, keys) = rest.split_first().ok_or(USAGE)?;
    let keys: Vec<&[u8]> = keys.iter().map(|k| k.as_bytes()).collect();

    match command.as_str() {
        "add" => {
            let domain = open_or_create(id, storage, options)?;
            domain.add_multiple(&keys)?;
            domain.flush()?;
            println!("{}", domain.get_count());
        }
        "freq" => {
            let domain = FrequencyDomain::load(id, storage, options)?;
            let frequencies = domain.get_frequency(&keys)?;
            for key in rest[1..].iter() {
                let estimate = frequencies.get(key.as_bytes()).copied().unwrap_or(0);
                println!("{}\t{}", key, estimate);
            }
        }
        "count" => {
            let domain = FrequencyDomain::load(id, storage, options)?;
            println!("{}", domain.get_count());
        }
        "clear" => {
            let domain = FrequencyDomain::load(id, storage, options)?;
            domain.clear()?;
            domain.flush()?;
        }
        "destroy" => {
            FrequencyDomain::load(id, storage, options)?.destroy()?;
        }
        _ => return Err(USAGE.into()),
    }
    Ok(())
}

fn open_or_create(
    id: &str,
    storage: Arc<dyn Storage>,
    options: DomainOptions,
) -> Result<FrequencyDomain, DomainError> {
    match FrequencyDomain::load(id, Arc::clone(&storage), options.clone()) {
        Err(DomainError::StorageRead(StorageError::NotFound(_))) => {
            FrequencyDomain::create(Info::new(id, DomainType::Frequency), storage, options)
        }
        result => result,
    }
}
