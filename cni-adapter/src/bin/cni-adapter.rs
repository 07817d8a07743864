use clap::Parser;
use std::env;
use std::ffi::OsString;
use std::io::{self, Read};
use std::process;
use tracing::{error, info};

use cni_adapter::commands::{resolve_config, run_hook, wants_usage, Cli, HOOK_USAGE};
use cni_adapter::logging;

fn main() {
    let args: Vec<OsString> = env::args_os().collect();
    if wants_usage(&args) {
        eprintln!("{}", HOOK_USAGE);
        process::exit(1);
    }

    let mut stdin = Vec::new();
    if let Err(err) = io::stdin().read_to_end(&mut stdin) {
        eprintln!("unable to read stdin: {}", err);
        process::exit(1);
    }

    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("arg parsing error: {}", err);
            process::exit(1);
        }
    };

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("arg parsing error: {}", err);
            process::exit(1);
        }
    };

    if let Err(err) = logging::init(config.log_dir.as_deref(), &cli.handle) {
        eprintln!("{:#}", err);
        process::exit(1);
    }
    info!("parsed: {:?}", args);
    info!("adapter config: {:?}", config);

    // Run the hook
    if let Err(err) = run_hook(&cli, &config, &stdin) {
        error!("{:#}", err);
        process::exit(1);
    }
}
