mod telemetry;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use dashpipe::{
    import_header, load_config, lookup_region, ImportOptions, JsonFileStore, RecordStore, Schema,
    Session, SortDirection,
};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "dpipe")]
#[command(about = "Browse, summarize and edit dengue case and student assessment records", long_about = None)]
struct Cli {
    /// Path to the dashboard config (YAML). Missing file means defaults.
    #[arg(long, default_value = "dashpipe.yaml", env = "DASHPIPE_CONFIG")]
    config: PathBuf,

    /// Store file; overrides the config and DASHPIPE_STORE_PATH
    #[arg(long)]
    store: Option<PathBuf>,

    /// Collection to operate on (dengueData or studentData)
    #[arg(short, long, default_value = "dengueData")]
    collection: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bulk-import a delimited text file
    Import {
        file: PathBuf,
        #[arg(long, default_value_t = ',')]
        delimiter: char,
        /// The first line is data, not a header
        #[arg(long, default_value_t = false)]
        no_header: bool,
    },
    /// Create one record from field=value pairs
    Add {
        #[arg(long = "set", value_parser = parse_assignment, required = true)]
        fields: Vec<(String, String)>,
    },
    /// Merge field=value pairs into an existing record
    Edit {
        id: String,
        #[arg(long = "set", value_parser = parse_assignment, required = true)]
        fields: Vec<(String, String)>,
    },
    Delete {
        id: String,
    },
    /// Print one page of the filtered, sorted table
    View(ViewArgs),
    /// Print the summary figures and the top entries
    Stats,
    /// Print every chart of the collection's dashboard
    Charts(ViewArgs),
    /// Print per-region totals and their shading
    Regions {
        /// Only this region, spelled any way a map feature spells it
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Args, Debug)]
struct ViewArgs {
    /// Substring filter, e.g. --filter location=iligan
    #[arg(long, value_parser = parse_assignment)]
    filter: Option<(String, String)>,
    /// Substring filter over the full name
    #[arg(long)]
    name: Option<String>,
    /// Exact match, e.g. --exact age=10
    #[arg(long, value_parser = parse_assignment)]
    exact: Option<(String, String)>,
    #[arg(long)]
    sort: Option<String>,
    #[arg(long, default_value_t = false, requires = "sort")]
    desc: bool,
    #[arg(long, default_value_t = 1)]
    page: usize,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => {
            Ok((field.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected field=value, got '{raw}'")),
    }
}

fn borrowed(pairs: &[(String, String)]) -> Vec<(&str, &str)> {
    pairs.iter().map(|(f, v)| (f.as_str(), v.as_str())).collect()
}

fn apply_view(session: &mut Session, args: &ViewArgs) {
    let view = session.view_mut();
    if let Some((field, value)) = &args.filter {
        view.set_filter(field, value);
    }
    if let Some(name) = &args.name {
        view.set_name_filter(name);
    }
    if let Some((field, value)) = &args.exact {
        view.set_exact_filter(field, value);
    }
    if let Some(key) = &args.sort {
        let direction = if args.desc {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        view.set_sort(key, direction);
    }
    view.current_page = args.page;
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    telemetry::init_tracing();
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(store) = cli.store {
        config.store_path = store;
    }
    let schema: &'static Schema = Schema::by_collection(&cli.collection)?;
    let mut store = JsonFileStore::open(&config.store_path)
        .with_context(|| format!("Failed to open store {:?}", config.store_path))?;
    let mut session = Session::new(schema, config.derive_options()?);
    let loaded = session.load(&store)?;
    info!(collection = schema.collection, loaded, "session ready");

    run(cli.command, &mut session, &mut store)
}

fn run(command: Commands, session: &mut Session, store: &mut dyn RecordStore) -> Result<()> {
    match command {
        Commands::Import {
            file,
            delimiter,
            no_header,
        } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read import file {:?}", file))?;
            let options = ImportOptions {
                delimiter,
                has_header: !no_header,
            };
            let report = session.import(store, &text, options);
            if report.dropped > 0 {
                warn!(
                    dropped = report.dropped,
                    "rows skipped; expected columns: {}",
                    import_header(session.schema()).join(delimiter.to_string().as_str())
                );
            }
            print_json(&report)?;
            if !report.ok {
                bail!("{} of {} rows were not stored", report.failed, report.failed + report.created);
            }
        }
        Commands::Add { fields } => {
            let id = session.create_from_input(store, &borrowed(&fields))?;
            print_json(&json!({ "id": id }))?;
        }
        Commands::Edit { id, fields } => {
            session.update_from_input(store, &id, &borrowed(&fields))?;
            print_json(&json!({ "id": id, "updated": fields.len() }))?;
        }
        Commands::Delete { id } => {
            session.delete(store, &id)?;
            print_json(&json!({ "id": id, "deleted": true }))?;
        }
        Commands::View(args) => {
            apply_view(session, &args);
            let derived = session.derive()?;
            print_json(&json!({
                "page": derived.page,
                "matched": derived.matched,
                "page_hash": derived.page_hash,
            }))?;
        }
        Commands::Stats => {
            let derived = session.derive()?;
            print_json(&json!({
                "aggregates": derived.aggregates,
                "leaders": derived.leaders,
            }))?;
        }
        Commands::Charts(args) => {
            apply_view(session, &args);
            print_json(&session.render_charts()?)?;
        }
        Commands::Regions { name } => {
            if session.schema().region_field.is_none() {
                bail!("collection '{}' has no region field", session.schema().collection);
            }
            let regions = session.derive()?.regions;
            match name {
                Some(name) => match lookup_region(&regions, &name) {
                    Some(shade) => print_json(shade)?,
                    None => bail!("no records for region '{}'", name),
                },
                None => print_json(&regions)?,
            }
        }
    }
    Ok(())
}
