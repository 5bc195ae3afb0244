//! VSIX downloader CLI entrypoint.
//!
//! Downloads the requested extensions in order and reports where they were
//! saved. The first failure stops the batch and sets a non-zero exit code.

use clap::Parser;
use std::io::Write;
use vsix_downloader::cli::Cli;
use vsix_downloader::error::Result;
use vsix_downloader::output::{saved_paths_listing, success_message, write_stderr_line};
use vsix_downloader::pipeline::Downloader;
use vsix_downloader::transport::{Transport, UreqTransport};

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    let mut stderr = std::io::stderr();
    let transport = UreqTransport::with_timeout(cli.request_timeout());
    let run_result = run(&cli, transport, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Install `env_logger` at the level implied by the flags; `RUST_LOG` wins.
fn init_logging(cli: &Cli) {
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .format_target(false)
        .parse_default_env()
        .init();
}

fn run<T: Transport>(cli: &Cli, transport: T, stderr: &mut dyn Write) -> Result<()> {
    let config = cli.download_config();
    let dest_dir = config.resolve_dest_dir()?;
    let specs = cli.requested_specs();

    let downloader = Downloader::with_transport(config, transport);
    let saved = downloader.download_many(&specs)?;

    if !cli.quiet {
        write_stderr_line(stderr, success_message(saved.len(), &dest_dir));
        write_stderr_line(stderr, saved_paths_listing(&saved));
    }
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}
