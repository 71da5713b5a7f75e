//! odfmerge - render an Open Document report template with JSON data
//!
//! ```text
//! odfmerge -t invoice.odt -i invoice.json -o out.odt
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use mail_merge::{load_context_from_file, JsonConfig, MergeOptions, MissingKeyPolicy, ValueEscape};
use report::{OpenDocument, PrepareOptions, RenderOptions};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about = "Merge JSON data into an Open Document template", long_about = None)]
struct Args {
    /// The template file to be merged
    #[arg(short = 't', long = "template", value_name = "TEMPLATE")]
    template: PathBuf,

    /// The JSON data file to read from
    #[arg(short = 'i', long = "input", value_name = "JSON", required_unless_present = "prepare_only")]
    input: Option<PathBuf>,

    /// The output file to be written
    #[arg(short = 'o', long = "output", value_name = "OUTPUT")]
    output: PathBuf,

    /// Log every rewrite step
    #[arg(long)]
    debug: bool,

    /// Indent the rewritten XML
    #[arg(long)]
    pretty: bool,

    /// Insert data values without XML escaping
    #[arg(long)]
    raw_values: bool,

    /// Fail when the template references a key missing from the data
    #[arg(long)]
    strict: bool,

    /// Dotted path of the object in the data file to use as the root
    #[arg(long, value_name = "PATH")]
    root: Option<String>,

    /// Write the prepared template without merging any data
    #[arg(long)]
    prepare_only: bool,
}

impl Args {
    fn render_options(&self) -> RenderOptions {
        let mut merge = MergeOptions::default();
        if self.strict {
            merge = merge.with_missing_key(MissingKeyPolicy::Error);
        }
        if self.raw_values {
            merge = merge.with_escape(ValueEscape::None);
        }
        RenderOptions::new()
            .with_prepare(PrepareOptions::new().with_pretty_print(self.pretty))
            .with_merge(merge)
    }

    fn json_config(&self) -> JsonConfig {
        match &self.root {
            Some(root) => JsonConfig::new().with_root_path(root.clone()),
            None => JsonConfig::new(),
        }
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<()> {
    let mut doc = OpenDocument::open(&args.template)
        .with_context(|| format!("error opening template {}", args.template.display()))?
        .with_options(args.render_options());

    if args.prepare_only {
        doc.prepare().context("error preparing template")?;
    } else {
        let input = args.input.as_ref().context("missing data file (-i)")?;
        let data = load_context_from_file(input, args.json_config())
            .with_context(|| format!("error loading data file {}", input.display()))?;
        debug!("Loaded data from {}", input.display());
        doc.execute(&data).context("error merging data with template")?;
    }

    doc.write_file(&args.output)
        .with_context(|| format!("error writing output {}", args.output.display()))?;
    info!("Output written to {}", args.output.display());
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.debug);

    match run(&args) {
        Ok(()) => {
            println!("{}", args.output.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("odfmerge: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
