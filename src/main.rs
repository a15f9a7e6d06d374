use barcall::{
    cli::{init_verbose, Cli, Command, FULL_VERSION},
    commands::{cross_validate, sweep},
    utils::{handle_error_and_exit, Result},
};
use clap::Parser;

fn runner() -> Result<()> {
    let cli = Cli::parse();
    init_verbose(&cli);
    let subcommand_name = match cli.command {
        Command::Sweep(_) => "sweep",
        Command::CrossValidate(_) => "cross-validate",
    };

    log::info!(
        "Running {}-{} [{}]",
        env!("CARGO_PKG_NAME"),
        *FULL_VERSION,
        subcommand_name
    );
    match cli.command {
        Command::Sweep(args) => sweep::sweep(args)?,
        Command::CrossValidate(args) => cross_validate::cross_validate(args)?,
    }
    log::info!("{} end", env!("CARGO_PKG_NAME"));
    Ok(())
}

fn main() {
    if let Err(e) = runner() {
        handle_error_and_exit(e);
    }
}
