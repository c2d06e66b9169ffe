use clap::Parser;

mod subcmd_impls;

use subcmd_impls::args::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    utils::init_logger(cli.verbose())?;
    cli.run_program()
}
