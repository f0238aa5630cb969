use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};
use weft_editor_core::config::load_schema_rules;
use weft_editor_core::{Dom, EditorConfig, Schema, SchemaAttributes, normalize};

#[derive(Parser)]
#[command(version, about = "Markup schema tools for the weft editor engine", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// JSON file with extra schema rules
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// Engine configuration file
    #[arg(long, global = true, env = "WEFT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalise an HTML fragment through the schema and print the result
    Sanitize {
        /// HTML file to read, `-` for stdin
        input: PathBuf,
    },
    /// Print the rules in the order they are matched
    Rules,
}

fn main() -> Result<()> {
    init_miette();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let schema = load_schema(cli.config.as_deref(), cli.schema.as_deref())?;

    match cli.command {
        Commands::Sanitize { input } => sanitize(&schema, &input)?,
        Commands::Rules => print_rules(&schema),
    }

    Ok(())
}

fn load_schema(config: Option<&Path>, rules: Option<&Path>) -> Result<Schema> {
    // Engine timing options are not used here, so no environment overrides.
    let mut config = match config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    if let Some(path) = rules {
        config.schema.extend(load_schema_rules(path)?);
    }
    let schema = config.build_schema();
    tracing::debug!(rules = schema.rules().len(), "schema ready");
    Ok(schema)
}

fn sanitize(schema: &Schema, input: &Path) -> Result<()> {
    let html = if input == Path::new("-") {
        let mut html = String::new();
        std::io::stdin()
            .read_to_string(&mut html)
            .into_diagnostic()
            .wrap_err("failed to read stdin")?;
        html
    } else {
        std::fs::read_to_string(input)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read {}", input.display()))?
    };

    let mut dom = Dom::new();
    let root = dom.create_element("div");
    dom.append_child(dom.body(), root);
    dom.set_inner_html(root, &html);
    let report = normalize(schema, &mut dom, root);
    tracing::info!(
        unwrapped = report.unwrapped,
        dropped = report.dropped,
        filtered = report.filtered,
        "sanitized {}",
        input.display()
    );
    println!("{}", dom.inner_html(root));
    Ok(())
}

fn describe(attributes: &SchemaAttributes) -> String {
    let attrs = attributes
        .attrs
        .iter()
        .map(|(name, value)| format!("{name}={value}"));
    let styles = attributes
        .style
        .iter()
        .map(|(name, value)| format!("style.{name}={value}"));
    attrs.chain(styles).collect::<Vec<_>>().join(" ")
}

fn print_rules(schema: &Schema) {
    for (index, rule) in schema.rules().iter().enumerate() {
        let mut line = format!("{:>3}  {:<8} {}", index + 1, rule.schema_type.as_str(), rule.name);
        let attributes = describe(&rule.attributes);
        if !attributes.is_empty() {
            line.push_str("  ");
            line.push_str(&attributes);
        }
        println!("{line}");
    }
    let mut globals: Vec<_> = schema.data().globals.iter().collect();
    globals.sort_by_key(|(schema_type, _)| **schema_type);
    for (schema_type, attributes) in globals {
        println!("  *  {:<8} (global)  {}", schema_type.as_str(), describe(attributes));
    }
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}

#[cfg(test)]
mod tests {
    use weft_editor_core::config::INPUT_DELAY_ENV;

    use super::*;

    #[test]
    fn test_load_schema_ignores_input_delay_env() {
        // SAFETY: the only test in this binary that touches the environment.
        unsafe { std::env::set_var(INPUT_DELAY_ENV, "fast") };
        let schema = load_schema(None, None).unwrap();
        assert_eq!(schema.rules().len(), Schema::with_defaults().rules().len());
    }
}
