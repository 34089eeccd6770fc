//! # hostprov CLI
//!
//! Binary entry point. Parses arguments, runs the selected command and turns
//! library errors into stable exit codes (see `hostprov::exit_codes`).

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;

use hostprov::exit_codes;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    match cli.execute() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

fn exit_code_for(error: &anyhow::Error) -> u8 {
    let code = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<hostprov::Error>())
        .map_or(exit_codes::GENERAL_ERROR, hostprov::Error::exit_code);
    u8::try_from(code).unwrap_or(1)
}
