//! `dashsync`: load a stored dashboard, attach two viewers and drive filter selections

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ds_core::model::LocalFileItem;
use ds_core::{
    Dashboard, DataSourceItem, FilterScalar, FilterValueSet, PersistenceSink, SaveOutcome, SdkContext, SdkSettings,
};
use ds_data::{CsvValueDomain, LocalFileStore};
use ds_views::{DashboardViewer, DataSourceCatalog, ViewState};

mod sample;

#[derive(Parser)]
#[command(name = "dashsync")]
#[command(about = "Dashboard filter synchronization between attached viewers", long_about = None)]
struct Cli {
    /// Directory holding dashboard containers
    #[arg(long, global = true, env = "DASHSYNC_STORAGE", default_value = "data")]
    storage: PathBuf,

    /// JSON file with SDK settings
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the sample "Manufacturing" dashboard and its production data
    Init,
    /// Print the filters and visualizations of a dashboard
    Show {
        #[arg(long)]
        dashboard: String,
    },
    /// Apply filter selections through one viewer and report what another one sees
    Select(SelectArgs),
}

#[derive(Args)]
struct SelectArgs {
    #[arg(long)]
    dashboard: String,

    /// CSV file serving filter value domains
    #[arg(long)]
    values: Option<PathBuf>,

    /// `<filter title>=<v1,v2,...>`; an empty list selects all values
    #[arg(long = "select", value_parser = parse_selection)]
    selections: Vec<(String, Vec<String>)>,

    /// Save the dashboard after applying the selections
    #[arg(long, default_value_t = false)]
    save: bool,
}

fn parse_selection(raw: &str) -> Result<(String, Vec<String>), String> {
    let (title, values) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected <filter title>=<values>, got '{}'", raw))?;
    let title = title.trim();
    if title.is_empty() {
        return Err(format!("missing filter title in '{}'", raw));
    }

    let values = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    Ok((title.to_string(), values))
}

fn describe(selection: &FilterValueSet) -> String {
    match selection {
        FilterValueSet::SelectedValues(values) if values.is_empty() => "(all values)".to_string(),
        FilterValueSet::SelectedValues(values) => values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", "),
        FilterValueSet::DateRule(rule) => format!("{:?}", rule),
        FilterValueSet::DateRange(range) => format!("{} .. {}", range.from(), range.to()),
        other => format!("{:?}", other.filter_type()),
    }
}

fn print_state(label: &str, state: &ViewState) {
    println!("{} - {}", label, state.title);
    for (id, filter) in &state.filters {
        println!("  filter {:<20} [{}] {}", filter.title, id, describe(&filter.selection));
    }
    for (id, visualization) in &state.visualizations {
        println!("  visualization {:<13} [{}] {:?}", visualization.title, id, visualization.chart_type);
        for (field, selection) in &visualization.quick_filters {
            println!("    quick filter {:<10} {}", field, describe(selection));
        }
    }
}

fn context(cli: &Cli, store: Arc<LocalFileStore>, values: Option<&PathBuf>) -> Result<Arc<SdkContext>> {
    let settings = match &cli.settings {
        Some(path) => SdkSettings::from_json_file(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?,
        None => SdkSettings::default(),
    };

    let mut builder = SdkContext::builder().settings(settings).loader(store);
    if let Some(path) = values {
        builder = builder.value_domain(Arc::new(CsvValueDomain::from_file(path.clone())));
    }
    Ok(builder.build())
}

async fn show(cli: &Cli, dashboard_id: &str) -> Result<()> {
    let store = Arc::new(LocalFileStore::new(&cli.storage));
    let ctx = context(cli, store, None)?;
    let dashboard = Dashboard::load(&ctx, dashboard_id).await?;

    println!("{} ({})", dashboard.title(), dashboard_id);
    if !dashboard.description().is_empty() {
        println!("  {}", dashboard.description());
    }
    for filter in dashboard.filters().iter() {
        let kind = if filter.is_date() { "date filter" } else { "filter" };
        println!("  {} {} on '{}'", kind, filter.title(), filter.field_name()?);
    }
    for visualization in dashboard.visualizations().iter() {
        let quick: Vec<String> = visualization
            .filters()?
            .iter()
            .map(|q| q.field_name().to_string())
            .collect();
        println!(
            "  visualization {} ({:?}) quick filters: {}",
            visualization.title(),
            visualization.chart_type()?,
            quick.join(", ")
        );
    }
    Ok(())
}

async fn select(cli: &Cli, args: &SelectArgs) -> Result<()> {
    let store = Arc::new(LocalFileStore::new(&cli.storage));
    let ctx = context(cli, store.clone(), args.values.as_ref())?;

    let editor = DashboardViewer::new(ctx.clone());
    let follower = DashboardViewer::new(ctx.clone());

    let values_file = args.values.clone();
    editor.set_on_data_sources_requested(Some(Arc::new(move |catalog: &mut DataSourceCatalog| {
        if let Some(path) = &values_file {
            catalog.items.push(DataSourceItem::LocalFile(LocalFileItem {
                id: "values".to_string(),
                title: path.display().to_string(),
                uri: format!("local:/{}", path.display()),
            }));
        }
    })));

    let dashboard = editor
        .load_dashboard(&args.dashboard)
        .await?
        .context("Dashboard load was superseded")?;
    follower.set_dashboard(dashboard.clone());
    info!(dashboard = %args.dashboard, views = dashboard.attached_views(), "viewers attached");

    let catalog = editor.request_data_sources()?;
    info!(sources = catalog.len(), "data sources available for new visualizations");

    for (title, raw_values) in &args.selections {
        let filter = match dashboard.filters().get_by_title(title) {
            Some(filter) => filter,
            None => bail!("Dashboard '{}' has no filter titled '{}'", args.dashboard, title),
        };

        if ctx.value_domain().is_some() {
            match filter.filter_values().await {
                Ok(domain) => {
                    let unknown: Vec<&String> = raw_values
                        .iter()
                        .filter(|v| !domain.iter().any(|d| &d.label == *v))
                        .collect();
                    if !unknown.is_empty() {
                        warn!(filter = %title, ?unknown, "values not found in the value domain");
                    }
                }
                Err(e) => warn!(filter = %title, error = %e, "value domain unavailable"),
            }
        }

        let values: Vec<FilterScalar> = raw_values.iter().map(|v| FilterScalar::parse(v)).collect();
        let report = editor
            .set_filter_selected_values(filter.id(), values)
            .with_context(|| format!("Failed to apply selection to '{}'", title))?;
        info!(filter = %title, notified = report.notified(), failures = report.failures.len(), "selection applied");
    }

    print_state("editor", &editor.state());
    print_state("follower", &follower.state());
    println!(
        "follower received {} selection and {} structure notifications",
        follower.state().selection_notifications,
        follower.state().structure_notifications
    );

    if args.save {
        let sink: Arc<dyn PersistenceSink> = store;
        match dashboard.save(sink, None).await? {
            SaveOutcome::Saved(receipt) => println!("saved as '{}'", receipt.dashboard_id),
            SaveOutcome::Discarded(receipt) => warn!(dashboard = %receipt.dashboard_id, "save result discarded"),
        }
    } else if dashboard.has_pending_changes() {
        info!("dashboard has unsaved changes; pass --save to keep them");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Init => {
            let store = LocalFileStore::new(&cli.storage);
            let csv_path = sample::install(&store).await?;
            println!(
                "wrote dashboard '{}' and {}",
                sample::SAMPLE_DASHBOARD_ID,
                csv_path.display()
            );
        }
        Commands::Show { dashboard } => show(&cli, dashboard).await?,
        Commands::Select(args) => select(&cli, args).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection() {
        assert_eq!(
            parse_selection("Plant=Austin, Shenzhen").unwrap(),
            ("Plant".to_string(), vec!["Austin".to_string(), "Shenzhen".to_string()])
        );
        assert_eq!(parse_selection("Line=").unwrap(), ("Line".to_string(), Vec::new()));
        assert!(parse_selection("Plant").is_err());
        assert!(parse_selection("=Austin").is_err());
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(&FilterValueSet::default()), "(all values)");
        assert_eq!(describe(&FilterValueSet::selected(["L1", "L2"])), "L1, L2");
        assert_eq!(describe(&FilterValueSet::EmptyValues), "FilterEmptyValues");
    }

    #[test]
    fn test_cli_parses_repeated_selections() {
        let cli = Cli::try_parse_from([
            "dashsync",
            "--storage",
            "/tmp/store",
            "select",
            "--dashboard",
            "manufacturing",
            "--select",
            "Plant=Austin",
            "--select",
            "Line=L1,L2",
            "--save",
        ])
        .unwrap();

        assert_eq!(cli.storage, PathBuf::from("/tmp/store"));
        match cli.command {
            Commands::Select(args) => {
                assert_eq!(args.selections.len(), 2);
                assert_eq!(args.selections[1].1, vec!["L1", "L2"]);
                assert!(args.save);
            }
            _ => panic!("expected select"),
        }
    }

    #[tokio::test]
    async fn test_select_against_sample_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = LocalFileStore::new(dir.path());
        let csv_path = sample::install(&store).await.unwrap();

        let cli = Cli::try_parse_from([
            "dashsync".to_string(),
            "--storage".to_string(),
            dir.path().display().to_string(),
            "select".to_string(),
            "--dashboard".to_string(),
            sample::SAMPLE_DASHBOARD_ID.to_string(),
            "--values".to_string(),
            csv_path.display().to_string(),
            "--select".to_string(),
            "Plant=Austin".to_string(),
            "--save".to_string(),
        ])
        .unwrap();
        let Commands::Select(args) = &cli.command else {
            panic!("expected select");
        };
        select(&cli, args).await.unwrap();

        let saved = store.list().await.unwrap();
        assert_eq!(saved, vec![sample::SAMPLE_DASHBOARD_ID]);
        let model = ds_core::DashboardLoader::fetch(&store, sample::SAMPLE_DASHBOARD_ID).await.unwrap();
        assert_eq!(model.filters[0].selection, FilterValueSet::selected(["Austin"]));
    }
}
