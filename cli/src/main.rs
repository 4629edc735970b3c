#![deny(missing_docs)]

//! # roas CLI
//!
//! Command line front-end for the OpenAPI generator: scans a Rust module
//! for annotated types and handler directives and writes the resulting
//! document to stdout or a file.

use clap::Parser;
use roas_core::{AppResult, ModuleScanner, OutputTarget};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about = "roas is an OpenAPI 3.0 generator for Rust services"
)]
struct Cli {
    /// Root directory of the module to document.
    module_path: PathBuf,

    /// Entry file carrying the top-level directives (@Title, @Version, ...).
    main_file_path: PathBuf,

    /// Only search handler directives under this path.
    #[clap(long)]
    handler_path: Option<PathBuf>,

    /// Output file; `-` writes to stdout.
    #[clap(long, default_value = "-")]
    output: String,

    /// Show debug messages.
    #[clap(long)]
    debug: bool,
}

fn run() -> AppResult<()> {
    let cli = Cli::parse();

    let mut scanner = ModuleScanner::new(&cli.module_path, &cli.main_file_path)
        .with_debug(cli.debug);
    if let Some(handler_path) = &cli.handler_path {
        scanner = scanner.with_handler_path(handler_path);
    }

    let (document, warnings) = roas_core::generate(&mut scanner)?;
    for warning in &warnings {
        eprintln!("warning: {}", warning);
    }

    roas_core::write_document(&document, &OutputTarget::from_arg(&cli.output))
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{}", error);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli_structure() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_both_positionals_are_required() {
        use clap::CommandFactory;
        let result = Cli::command().try_get_matches_from(["roas", "./module"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_output_defaults_to_stdout() {
        let cli = Cli::parse_from(["roas", "./module", "./module/src/main.rs"]);
        assert_eq!(cli.output, "-");
        assert!(!cli.debug);
        assert!(cli.handler_path.is_none());
    }
}
