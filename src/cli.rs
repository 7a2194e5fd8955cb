//! Command-line interface implementation for jtple.
//! Provides argument parsing and help text formatting using clap.

use clap::{error::ErrorKind, CommandFactory, Parser};
use std::path::PathBuf;

/// Command-line arguments structure for jtple.
#[derive(Parser, Debug)]
#[command(author, version, about = "jtple: instantiate HTML templates marked inside a document", long_about = None)]
pub struct Args {
    /// HTML document containing template markers
    #[arg(value_name = "DOCUMENT")]
    pub document: PathBuf,

    /// Configuration file (JSON or YAML); defaults to jtple.json/yml/yaml next to the document
    #[arg(short, long, value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Name of the template to instantiate
    #[arg(short, long, value_name = "TEMPLATE")]
    pub template: Option<String>,

    /// JSON or YAML file with the values for the new instance
    #[arg(short = 'd', long, value_name = "VALUES", requires = "template")]
    pub values: Option<PathBuf>,

    /// Selector of the element the new instance is appended to
    #[arg(long, value_name = "SELECTOR", default_value = "body")]
    pub target: String,

    /// Write the resulting document here instead of stdout
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// List registered template names and exit
    #[arg(short, long)]
    pub list: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parses command line arguments and returns the Args structure.
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument {
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
