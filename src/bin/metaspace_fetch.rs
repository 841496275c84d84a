use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use metaspace_fetch::app::{App, DownloadOptions, ProgressSink, QueryPlan};
use metaspace_fetch::config::{ConfigLoader, ResolvedConfig};
use metaspace_fetch::domain::Polarity;
use metaspace_fetch::error::FetchError;
use metaspace_fetch::metaspace::MetaspaceHttpClient;
use metaspace_fetch::output::{JsonOutput, OutputMode, TextOutput};
use metaspace_fetch::selection::Selection;
use metaspace_fetch::staging::Staging;

#[derive(Parser)]
#[command(name = "metaspace-fetch")]
#[command(about = "Search, filter and download METASPACE imaging mass spectrometry datasets")]
#[command(version, author)]
struct Cli {
    /// Print machine-readable JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Search datasets and print the filtered table")]
    Search(QueryArgs),
    #[command(about = "Show download links of one dataset")]
    Links(LinksArgs),
    #[command(about = "Search datasets and download the selected ones")]
    Download(DownloadArgs),
}

#[derive(Args, Clone, Default)]
struct QueryArgs {
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    keyword: Option<String>,

    #[arg(long = "dataset-id")]
    dataset_ids: Vec<String>,

    #[arg(long)]
    submitter_id: Option<String>,

    #[arg(long)]
    group_id: Option<String>,

    #[arg(long)]
    project_id: Option<String>,

    #[arg(long)]
    polarity: Option<String>,

    #[arg(long)]
    ionisation_source: Option<String>,

    #[arg(long)]
    analyzer_type: Option<String>,

    #[arg(long)]
    maldi_matrix: Option<String>,

    #[arg(long)]
    organism: Option<String>,

    #[command(flatten)]
    filter: FilterArgs,

    /// Regular expression matched against annotated ions; repeatable.
    #[arg(long = "molecule")]
    molecules: Vec<String>,
}

/// Local metadata filter; each flag is repeatable.
#[derive(Args, Clone, Default)]
struct FilterArgs {
    #[arg(long = "adduct")]
    adducts: Vec<String>,

    #[arg(long = "filter-analyzer")]
    analyzer: Vec<String>,

    #[arg(long = "filter-condition")]
    condition: Vec<String>,

    #[arg(long = "filter-group-id", id = "filter_group_id")]
    group_id: Vec<String>,

    #[arg(long = "filter-group-name")]
    group_name: Vec<String>,

    #[arg(long = "filter-group-short-name")]
    group_short_name: Vec<String>,

    #[arg(long = "filter-growth-conditions")]
    growth_conditions: Vec<String>,

    #[arg(long = "filter-ionisation-source", id = "filter_ionisation_source")]
    ionisation_source: Vec<String>,

    #[arg(long = "filter-maldi-matrix", id = "filter_maldi_matrix")]
    maldi_matrix: Vec<String>,

    #[arg(long = "filter-metadata-type")]
    metadata_type: Vec<String>,

    #[arg(long = "filter-organism", id = "filter_organism")]
    organism: Vec<String>,

    #[arg(long = "filter-organism-part")]
    organism_part: Vec<String>,

    #[arg(long = "filter-polarity", id = "filter_polarity")]
    polarity: Vec<String>,

    #[arg(long)]
    min_resolving_power: Vec<f64>,

    #[arg(long)]
    min_pixel_size_x: Vec<f64>,

    #[arg(long)]
    min_pixel_size_y: Vec<f64>,

    #[arg(long)]
    min_mz_value: Vec<f64>,
}

#[derive(Args)]
struct LinksArgs {
    id: String,

    #[arg(long)]
    config: Option<String>,
}

#[derive(Args)]
struct DownloadArgs {
    #[command(flatten)]
    query: QueryArgs,

    /// Dataset names (or IDs with --by-id) to download.
    #[arg(long = "select")]
    selected: Vec<String>,

    #[arg(long)]
    by_id: bool,

    #[arg(long, conflicts_with = "selected")]
    all: bool,

    #[arg(long)]
    dir: Option<Utf8PathBuf>,

    #[arg(long)]
    force: bool,

    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<FetchError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &FetchError) -> u8 {
    match error {
        FetchError::DatasetNotFound(_) | FetchError::MissingConfig => 2,
        FetchError::MetaspaceHttp(_)
        | FetchError::MetaspaceStatus { .. }
        | FetchError::GraphQl(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    match cli.command {
        Commands::Search(args) => run_search(args, output_mode),
        Commands::Links(args) => run_links(args, output_mode),
        Commands::Download(args) => run_download(args, output_mode),
    }
}

fn sink_for(output_mode: OutputMode) -> &'static dyn ProgressSink {
    match output_mode {
        OutputMode::Json => &JsonOutput,
        OutputMode::Text => &TextOutput,
    }
}

fn build_app(
    config: &ResolvedConfig,
    dir: Option<Utf8PathBuf>,
) -> miette::Result<App<MetaspaceHttpClient>> {
    let client = MetaspaceHttpClient::new(&config.endpoint)?;
    let staging = Staging::new(dir.unwrap_or_else(|| config.download_dir.clone()));
    Ok(App::new(client, staging))
}

fn run_search(args: QueryArgs, output_mode: OutputMode) -> miette::Result<()> {
    let config = ConfigLoader::resolve_or_default(args.config.as_deref())?;
    let plan = build_plan(&config, args)?;
    let app = build_app(&config, None)?;

    let table = app.run_query(&plan, sink_for(output_mode))?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_table(&table).into_diagnostic()?,
        OutputMode::Text => TextOutput::print_table(&table).into_diagnostic()?,
    }
    Ok(())
}

fn run_links(args: LinksArgs, output_mode: OutputMode) -> miette::Result<()> {
    let config = ConfigLoader::resolve_or_default(args.config.as_deref())?;
    let app = build_app(&config, None)?;

    let links = app.download_links(&args.id, sink_for(output_mode))?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_links(&links).into_diagnostic()?,
        OutputMode::Text => TextOutput::print_links(&links).into_diagnostic()?,
    }
    Ok(())
}

fn run_download(args: DownloadArgs, output_mode: OutputMode) -> miette::Result<()> {
    let DownloadArgs {
        query,
        selected,
        by_id,
        all,
        dir,
        force,
        dry_run,
    } = args;

    if !all && selected.is_empty() {
        return Err(miette::Report::msg(
            "nothing selected (use --select <NAME> or --all)",
        ));
    }

    let config = ConfigLoader::resolve_or_default(query.config.as_deref())?;
    let plan = build_plan(&config, query)?;
    let app = build_app(&config, dir)?;
    let sink = sink_for(output_mode);

    let table = app.run_query(&plan, sink)?;
    let selection = if all {
        Selection::All
    } else if by_id {
        Selection::by_id(selected)
    } else {
        Selection::by_name(selected)
    };
    let datasets = app.select(&table, &selection)?;
    let result = app.download(&datasets, &DownloadOptions { force, dry_run }, sink)?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_download(&result).into_diagnostic()?,
        OutputMode::Text => TextOutput::print_download(&result).into_diagnostic()?,
    }
    Ok(())
}

/// Starts from the config file and lets command-line flags replace its values.
fn build_plan(config: &ResolvedConfig, args: QueryArgs) -> Result<QueryPlan, FetchError> {
    let mut search = config.search.clone();
    if args.keyword.is_some() {
        search.keyword = args.keyword;
    }
    if !args.dataset_ids.is_empty() {
        search.dataset_ids = args.dataset_ids;
    }
    if args.submitter_id.is_some() {
        search.submitter_id = args.submitter_id;
    }
    if args.group_id.is_some() {
        search.group_id = args.group_id;
    }
    if args.project_id.is_some() {
        search.project_id = args.project_id;
    }
    if let Some(polarity) = args.polarity {
        search.polarity = Some(polarity.parse::<Polarity>()?);
    }
    if args.ionisation_source.is_some() {
        search.ionisation_source = args.ionisation_source;
    }
    if args.analyzer_type.is_some() {
        search.analyzer_type = args.analyzer_type;
    }
    if args.maldi_matrix.is_some() {
        search.maldi_matrix = args.maldi_matrix;
    }
    if args.organism.is_some() {
        search.organism = args.organism;
    }

    let mut filter = config.filter.clone();
    let flags = args.filter;
    replace_if_given(&mut filter.adducts, flags.adducts);
    replace_if_given(&mut filter.analyzer, flags.analyzer);
    replace_if_given(&mut filter.condition, flags.condition);
    replace_if_given(&mut filter.group_id, flags.group_id);
    replace_if_given(&mut filter.group_name, flags.group_name);
    replace_if_given(&mut filter.group_short_name, flags.group_short_name);
    replace_if_given(&mut filter.growth_conditions, flags.growth_conditions);
    replace_if_given(&mut filter.ionisation_source, flags.ionisation_source);
    replace_if_given(&mut filter.maldi_matrix, flags.maldi_matrix);
    replace_if_given(&mut filter.metadata_type, flags.metadata_type);
    replace_if_given(&mut filter.organism, flags.organism);
    replace_if_given(&mut filter.organism_part, flags.organism_part);
    replace_if_given(&mut filter.polarity, flags.polarity);
    replace_if_given(&mut filter.min_resolving_power, flags.min_resolving_power);
    replace_if_given(&mut filter.min_pixel_size_x, flags.min_pixel_size_x);
    replace_if_given(&mut filter.min_pixel_size_y, flags.min_pixel_size_y);
    replace_if_given(&mut filter.min_mz_value, flags.min_mz_value);

    let mut molecules = config.molecules.clone();
    replace_if_given(&mut molecules, args.molecules);

    Ok(QueryPlan {
        search,
        filter,
        molecules,
    })
}

fn replace_if_given<T>(target: &mut Vec<T>, given: Vec<T>) {
    if !given.is_empty() {
        *target = given;
    }
}
