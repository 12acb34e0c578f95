mod app;
mod commands;
mod output;

use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        eprintln!("\nCancelled.");
        std::process::exit(130);
    })
    .expect("failed to set Ctrl+C handler");

    let cli = Cli::parse();

    // Show macroscope info+ on stderr unless --json; --verbose enables debug; RUST_LOG overrides
    if !cli.global.json {
        let level = if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_module("macroscope", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .init();
    }

    match &cli.command {
        Command::Deobfuscate {
            paths,
            minimal,
            skip,
            max_iterations,
            max_steps,
            detailed,
        } => commands::deobfuscate::run(
            paths,
            &commands::deobfuscate::DeobfuscateOptions {
                minimal: *minimal,
                skip,
                max_iterations: *max_iterations,
                max_steps: *max_steps,
                detailed: *detailed,
                global: &cli.global,
            },
        ),
        Command::Render { path } => commands::render::run(path),
        Command::Deps { path, unresolved } => commands::deps::run(path, *unresolved, &cli.global),
    }
}
