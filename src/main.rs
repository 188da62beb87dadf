use std::process::ExitCode;

use clap::Parser;
use cmdline::cli::Cli;
use markdup::{
    markduplicates::{check_input, MarkDuplicates},
    opts::MarkDuplicatesOpts,
};

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

mod cmdline;
mod hts;
mod markdup;
mod utils;
#[cfg(test)]
mod tests;

fn run(cli: Cli) -> Result<(), anyhow::Error> {
    utils::logging::init_global_logger(cli.log_level)?;

    let args = std::env::args().collect::<Vec<_>>();
    let command_line =
        shlex::try_join(args.iter().map(|a| a.as_str())).unwrap_or_else(|_| args.join(" "));

    let opts = MarkDuplicatesOpts::from_cli(&cli, command_line)?;
    check_input(&opts)?;

    MarkDuplicates::new(opts).do_work()
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
