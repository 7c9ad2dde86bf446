#![cfg(not(tarpaulin_include))]

use log::info;
use pmo_dashboard::config::DashboardConfig;
use pmo_dashboard::dashboard::DashboardSession;
use pmo_dashboard::downloader::{self, ExportFormat};
use pmo_dashboard::filter::{FilterSelection, Selection, filter_dataset};
use pmo_dashboard::graph::ChartId;
use pmo_dashboard::render::{ImageFormat, render_chart};
use pmo_dashboard::schema::StatusKind;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

struct CliArgs {
    file: PathBuf,
    selection: FilterSelection,
    svg_dir: Option<PathBuf>,
    export: Option<PathBuf>,
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {} <file> [--project P] [--department D] [--manager M] [--svg-dir DIR] [--export PATH]",
        program
    )
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let program = args.first().map(String::as_str).unwrap_or("cli");
    let mut file = None;
    let mut selection = FilterSelection::default();
    let mut svg_dir = None;
    let mut export = None;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("missing value for {}\n{}", flag, usage(program)))
        };
        match arg.as_str() {
            "--project" => selection.project = Selection::from_raw(Some(value(arg)?.as_str())),
            "--department" => selection.department = Selection::from_raw(Some(value(arg)?.as_str())),
            "--manager" => selection.manager = Selection::from_raw(Some(value(arg)?.as_str())),
            "--svg-dir" => svg_dir = Some(PathBuf::from(value(arg)?)),
            "--export" => export = Some(PathBuf::from(value(arg)?)),
            "-h" | "--help" => return Err(usage(program)),
            other if other.starts_with("--") => {
                return Err(format!("unknown option {}\n{}", other, usage(program)));
            }
            other => file = Some(PathBuf::from(other)),
        }
    }

    Ok(CliArgs {
        file: file.ok_or_else(|| usage(program))?,
        selection,
        svg_dir,
        export,
    })
}

fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = DashboardConfig::from_env();
    let filename = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();
    let bytes = std::fs::read(&args.file)?;

    let mut session = DashboardSession::new(config.columns.clone());
    let outcome = session.on_upload(&filename, &bytes);
    println!("{}", outcome.message);
    if !outcome.is_loaded() {
        return Err("upload could not be processed".into());
    }

    let dataset = session.current_dataset().ok_or("no dataset loaded")?;
    let schema = session.schema();
    let filtered = filter_dataset(&dataset, &args.selection, schema)?;

    for kind in StatusKind::ALL {
        let counts = filtered.value_counts(schema.status_column(kind))?;
        println!("\n{} ({} projects)", kind.bar_title(schema), counts.total());
        if counts.is_empty() {
            println!("  (no values)");
        }
        for (label, count) in counts.labels().iter().zip(counts.counts()) {
            println!("  {:<30} {}", label, count);
        }
    }

    let figures = session.on_filters_changed(&args.selection)?;
    if let (Some(dir), Some(figures)) = (&args.svg_dir, &figures) {
        std::fs::create_dir_all(dir)?;
        let options = config.graph_options();
        for id in ChartId::ALL.into_iter().filter(|id| id.status().is_some()) {
            let svg = render_chart(figures, id, ImageFormat::Svg, &options)?;
            let path = dir.join(format!("{}.svg", id));
            std::fs::write(&path, svg)?;
            info!("Wrote {}", path.display());
        }
    }

    if let Some(path) = &args.export {
        let format = export_format(path)?;
        std::fs::write(path, downloader::export(&filtered, format)?)?;
        println!("\nExported {} rows to {}", filtered.len(), path.display());
    }

    Ok(())
}

fn export_format(path: &Path) -> Result<ExportFormat, Box<dyn std::error::Error>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("csv");
    Ok(ExportFormat::parse(extension)?)
}

fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("warn"));

    let args: Vec<String> = env::args().collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(2);
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
