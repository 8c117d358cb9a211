mod commands;
mod examples;
mod output;
mod report;
mod theme;

use std::fmt::Write;

use anyhow::Result;
use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Command, CommandFactory, FromArgMatches, Parser, Subcommand};
use colored::Colorize;

use commands::{
    check::{CheckArgs, handle_check},
    inspect::{InspectArgs, handle_inspect},
    specialize::{SpecializeArgs, handle_specialize},
};
use examples::{ExampleGroup, command_examples};
use output::{GlobalOptions, OutputFormat, OutputManager};
use theme::{ICONS, THEME};

const ENVIRONMENT_VARIABLES: &[(&str, &str)] = &[
    ("RUST_LOG", "Log filter for resolution diagnostics (e.g. fieldspec=debug)"),
    ("NO_COLOR", "Disable colored output when set"),
];

/// Resolve model field declarations written in TOML and inspect the resulting descriptors.
#[derive(Parser)]
#[command(name = "fieldspec", version)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a declaration file and show every descriptor
    Inspect(InspectArgs),

    /// Resolve declaration files and report warnings or the first error of each
    Check(CheckArgs),

    /// Substitute type parameters in every field annotation
    Specialize(SpecializeArgs),
}

fn cli_command() -> Command {
    let mut command = Cli::command()
        .styles(help_styles())
        .after_long_help(environment_help());
    for example in command_examples() {
        let help = examples_help(example.groups);
        command = command.mut_subcommand(example.name, |subcommand| subcommand.after_long_help(help));
    }
    command
}

fn help_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default().bold())
        .usage(AnsiColor::BrightBlue.on_default().bold())
        .literal(AnsiColor::Magenta.on_default())
        .placeholder(AnsiColor::BrightBlack.on_default())
        .error(AnsiColor::Red.on_default().bold())
}

fn examples_help(groups: &[ExampleGroup]) -> String {
    let mut help = String::new();
    let _ = writeln!(help, "{}", "Examples:".color(THEME.heading).bold());
    for group in groups {
        let _ = writeln!(help, "  {}", group.title.color(THEME.accent));
        for command in group.commands {
            let _ = writeln!(help, "    {} {command}", ICONS.arrow.color(THEME.muted));
        }
    }
    help
}

fn environment_help() -> String {
    let mut help = String::new();
    let _ = writeln!(help, "{}", "Environment Variables:".color(THEME.heading).bold());
    for (name, description) in ENVIRONMENT_VARIABLES {
        let _ = writeln!(help, "  {:<10}{description}", name.color(THEME.accent));
    }
    help
}

fn main() {
    env_logger::init();

    let matches = cli_command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());

    if let Err(err) = execute(cli) {
        eprintln!("{} {err:#}", "Error:".color(THEME.error).bold());
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> Result<()> {
    let options = GlobalOptions {
        output_format: cli.output,
        quiet: cli.quiet,
        verbose: cli.verbose,
        no_color: cli.no_color,
    };
    if options.no_color {
        colored::control::set_override(false);
    }

    let output = OutputManager::new(options);
    match cli.command {
        Commands::Inspect(args) => handle_inspect(args, &output),
        Commands::Check(args) => handle_check(args, &output),
        Commands::Specialize(args) => handle_specialize(args, &output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        cli_command().debug_assert();
    }

    #[test]
    fn every_subcommand_has_examples() {
        let command = cli_command();
        for example in command_examples() {
            assert!(command.find_subcommand(example.name).is_some(), "{}", example.name);
        }
    }

    #[test]
    fn check_accepts_several_files() {
        let matches = cli_command()
            .try_get_matches_from(["fieldspec", "--output", "json", "check", "a.toml", "b.toml"])
            .unwrap();
        let cli = Cli::from_arg_matches(&matches).unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Commands::Check(args) => assert_eq!(args.files.len(), 2),
            _ => panic!("expected check"),
        }
    }
}
