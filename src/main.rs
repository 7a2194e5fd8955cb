//! jtple's command-line entry point.
//! Reads a document, registers its templates and optionally stamps out one
//! populated instance before writing the document back out.

use std::path::Path;

use jtple::{
    cli::{get_args, Args},
    config::{find_config, load_values, Config},
    error::{default_error_handler, Error, Result},
    parser::parse_document,
    selector::Selector,
    Registry,
};

/// Main application entry point.
fn main() {
    let args = get_args();

    // Logger configuration
    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Off
        })
        .init();

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

/// Picks the configuration: an explicit file, a jtple.* file next to the
/// document, or the defaults.
fn resolve_config(explicit: Option<&Path>, document: &Path) -> Result<Config> {
    if let Some(path) = explicit {
        return Config::load(path);
    }
    let dir = document.parent().unwrap_or_else(|| Path::new("."));
    match find_config(dir) {
        Some(path) => Config::load(path),
        None => {
            log::debug!("No configuration file next to the document, using defaults");
            Ok(Config::default())
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = resolve_config(args.config.as_deref(), &args.document)?;
    let html = std::fs::read_to_string(&args.document).map_err(Error::IoError)?;
    let mut registry = Registry::new(parse_document(&html)?, config)?;

    if args.list {
        for name in registry.template_names() {
            println!("{name}");
        }
        return Ok(());
    }

    if let Some(name) = &args.template {
        let values = match &args.values {
            Some(path) => load_values(path)?,
            None => serde_json::Value::Null,
        };
        let target_selector = Selector::parse(&args.target)?;
        let document = registry.document();
        let target = target_selector
            .select_first(document, document.root())
            .ok_or_else(|| Error::ConfigError(format!("no element matches '{}'", args.target)))?;

        let instance = registry.get_new(name, &values)?;
        registry.append_to(instance, target)?;
        registry.show(instance)?;
        log::info!("Appended '{name}' to '{}'", args.target);
    }

    let output = registry.to_html();
    match &args.output {
        Some(path) => std::fs::write(path, output).map_err(Error::IoError)?,
        None => println!("{output}"),
    }
    Ok(())
}
