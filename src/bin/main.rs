//! Schema.org JSON-LD CLI
//!
//! Command-line tool for emitting JSON-LD for site records and querying the
//! Schema.org vocabulary.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use schemaorg_jsonld::{
    parse_ids, to_json_string, BreadcrumbListProvider, Crumb, DocumentAssembler, JsonLdOptions,
    RecordRef, RouteContext, SchemaError, Site, VocabularyStore,
};

#[derive(Parser)]
#[command(name = "schemaorg-jsonld")]
#[command(about = "Emit Schema.org JSON-LD for content records and query the vocabulary")]
#[command(version)]
struct Cli {
    /// Log decisions to stderr (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the JSON-LD document for a record's page
    Document(DocumentArgs),
    /// List every root-to-type path of a type
    Breadcrumbs(BreadcrumbsArgs),
    /// List the transitive subtypes of one or more types
    Subtypes(TypesArgs),
    /// Print the subtype/enumeration tree below one or more types
    Tree(TreeArgs),
}

#[derive(Args)]
struct DocumentArgs {
    /// Site file with vocabulary, mappings and records
    site: PathBuf,

    /// Record to render, as <entity_type>/<id>
    record: String,

    /// JSON options file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Explicit property order, comma separated (overrides the config file)
    #[arg(long, value_name = "PROPERTIES")]
    order: Option<String>,

    /// Base URL for relative record, file and link URLs
    #[arg(long)]
    base_url: Option<String>,

    /// Breadcrumb trail entries as <label>=<url>, outermost first
    #[arg(long = "crumb", value_name = "LABEL=URL")]
    crumbs: Vec<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct BreadcrumbsArgs {
    /// Vocabulary file ({"types": [...], "properties": [...]})
    vocabulary: PathBuf,

    type_id: String,
}

#[derive(Args)]
struct TypesArgs {
    vocabulary: PathBuf,

    /// Type ids, comma separated or repeated
    #[arg(required = true)]
    types: Vec<String>,
}

#[derive(Args)]
struct TreeArgs {
    vocabulary: PathBuf,

    #[arg(required = true)]
    types: Vec<String>,

    /// Types to leave out of the tree, with their descendants
    #[arg(long = "ignore", value_name = "TYPE")]
    ignore: Vec<String>,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "schemaorg_jsonld=debug",
        _ => "schemaorg_jsonld=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Write output to file or stdout
fn write_output(content: &str, output: Option<&PathBuf>) -> Result<(), SchemaError> {
    match output {
        Some(path) => {
            fs::write(path, content)?;
            eprintln!("Wrote JSON-LD to {}", path.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

fn parse_crumb(raw: &str) -> Result<Crumb, SchemaError> {
    let (label, url) = raw.split_once('=').ok_or_else(|| {
        SchemaError::InvalidConfig(format!("breadcrumb '{}' must look like <label>=<url>", raw))
    })?;
    Ok(Crumb::new(label.trim(), url.trim()))
}

fn split_ids(raw: &[String]) -> Vec<String> {
    raw.iter().flat_map(|r| parse_ids(r)).collect()
}

fn load_vocabulary(path: &Path) -> Result<VocabularyStore, SchemaError> {
    VocabularyStore::from_file(path)
}

fn run_document(args: DocumentArgs) -> Result<(), SchemaError> {
    let site = Site::from_file(&args.site)?;

    let mut options = match &args.config {
        Some(path) => JsonLdOptions::from_file(path)?,
        None => JsonLdOptions::default(),
    };
    if let Some(order) = &args.order {
        options.property_order = parse_ids(order);
    }
    if let Some(base_url) = &args.base_url {
        options.base_url = Some(base_url.clone());
    }
    options.validate()?;

    let reference =
        RecordRef::parse(&args.record).ok_or_else(|| SchemaError::InvalidRoute(args.record.clone()))?;
    let crumbs = args
        .crumbs
        .iter()
        .map(|c| parse_crumb(c))
        .collect::<Result<Vec<_>, _>>()?;
    let route = RouteContext::for_record(reference.clone()).with_breadcrumbs(crumbs);

    let assembler =
        DocumentAssembler::new(site.serializer(options)).with_provider(BreadcrumbListProvider);

    let document = assembler
        .build(&route)
        .ok_or_else(|| SchemaError::RecordNotFound(reference.to_string()))?;

    let output = to_json_string(&document, args.pretty)?;
    write_output(&output, args.output.as_ref())
}

fn run_breadcrumbs(args: BreadcrumbsArgs) -> Result<(), SchemaError> {
    let vocabulary = load_vocabulary(&args.vocabulary)?;
    let breadcrumbs = vocabulary.type_breadcrumbs(&args.type_id);
    eprintln!("{} breadcrumb path(s) for {}", breadcrumbs.len(), args.type_id);

    let output = serde_json::to_string_pretty(&breadcrumbs)?;
    write_output(&output, None)
}

fn run_subtypes(args: TypesArgs) -> Result<(), SchemaError> {
    let vocabulary = load_vocabulary(&args.vocabulary)?;
    let ids = split_ids(&args.types);
    let ids: Vec<&str> = ids.iter().map(String::as_str).collect();

    let subtypes = vocabulary.all_sub_types(&ids);
    let output = serde_json::to_string_pretty(&Value::from(
        subtypes.into_iter().collect::<Vec<_>>(),
    ))?;
    write_output(&output, None)
}

fn run_tree(args: TreeArgs) -> Result<(), SchemaError> {
    let vocabulary = load_vocabulary(&args.vocabulary)?;
    let ids = split_ids(&args.types);
    let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
    let ignore = split_ids(&args.ignore);
    let ignore: Vec<&str> = ignore.iter().map(String::as_str).collect();

    let tree = vocabulary.type_tree(&ids, &ignore);
    let output = serde_json::to_string_pretty(&tree)?;
    write_output(&output, None)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Document(args) => run_document(args),
        Commands::Breadcrumbs(args) => run_breadcrumbs(args),
        Commands::Subtypes(args) => run_subtypes(args),
        Commands::Tree(args) => run_tree(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
