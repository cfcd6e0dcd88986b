//! h5view CLI
//!
//! Headless front end for the h5view data browser: list file trees and
//! attributes, print datasets as tables, and extract cut profiles with an
//! optional peak fit.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Parser, Subcommand, ValueEnum};
use h5view_core::{
    Colormap, CutProfileData, FitSeed, LogNotifier, MenuEntry, NullSink, Overlay,
    PeakParameters, PlotSession, Rectangle, SelectionChange, ViewerConfig,
};
use h5view_io::{format_shape, DatasetSelection, H5Catalog};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    H5viewIo(#[from] h5view_io::Error),

    #[error("{0}")]
    Core(#[from] h5view_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Colormap selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColormapArg {
    Viridis,
    Hot,
    Grayscale,
}

impl From<ColormapArg> for Colormap {
    fn from(arg: ColormapArg) -> Self {
        match arg {
            ColormapArg::Viridis => Colormap::Viridis,
            ColormapArg::Hot => Colormap::Hot,
            ColormapArg::Grayscale => Colormap::Grayscale,
        }
    }
}

/// Starting point for the peak fit.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum SeedArg {
    /// All parameters start at 1
    Unit,
    /// Estimate amplitudes, widths and offset from the profile
    Peaks,
}

impl From<SeedArg> for FitSeed {
    fn from(arg: SeedArg) -> Self {
        match arg {
            SeedArg::Unit => FitSeed::Unit,
            SeedArg::Peaks => FitSeed::Peaks,
        }
    }
}

/// Browser for hierarchical scientific data files.
#[derive(Parser)]
#[command(name = "h5view")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the member tree of one or more files
    Tree {
        /// Input HDF5 file(s)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List the attributes of a group or dataset
    Attrs {
        /// Input HDF5 file
        file: PathBuf,

        /// Member path (`/` for the file itself)
        #[arg(default_value = "/")]
        path: String,
    },

    /// Print a dataset as a table
    Table {
        /// Input HDF5 file
        file: PathBuf,

        /// Dataset path
        dataset: String,

        /// Maximum number of rows to print
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show the colormap value ranges of a 2-D dataset
    Range {
        /// Input HDF5 file
        file: PathBuf,

        /// Dataset path
        dataset: String,

        /// Use log display
        #[arg(long)]
        log: bool,
    },

    /// Extract a cut profile from a 2-D dataset and print it as JSON
    Cut {
        /// Input HDF5 file
        file: PathBuf,

        /// Dataset path
        dataset: String,

        /// Rectangle corners in data coordinates
        #[arg(
            long,
            num_args = 4,
            value_names = ["X1", "Y1", "X2", "Y2"],
            allow_negative_numbers = true,
            required = true
        )]
        rect: Vec<f64>,

        /// Apply log display (cuts follow it when `cut_source` is `displayed`)
        #[arg(long)]
        log: bool,

        /// Freeze the profile before fitting
        #[arg(long)]
        freeze: bool,

        /// Fit the three-peak model to the profile
        #[arg(long)]
        fit: bool,

        /// Fit starting point
        #[arg(long, value_enum)]
        seed: Option<SeedArg>,

        /// Colormap used for the image
        #[arg(long, value_enum)]
        colormap: Option<ColormapArg>,

        /// Viewer configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

/// JSON document printed by `cut`.
#[derive(Serialize)]
struct CutReport<'a> {
    dataset: &'a str,
    rectangle: Rectangle,
    calibrated: bool,
    log: bool,
    colormap: Colormap,
    live: Option<&'a CutProfileData>,
    overlays: &'a [Overlay],
    fit: Option<PeakParameters>,
    menu: Vec<MenuEntry>,
}

/// What `cut` does once the dataset is shown.
#[derive(Debug, Clone, Copy)]
struct CutRequest {
    rectangle: Rectangle,
    log: bool,
    freeze: bool,
    fit: bool,
    pretty: bool,
}

fn load_config(path: Option<&Path>) -> Result<ViewerConfig> {
    let Some(path) = path else {
        return Ok(ViewerConfig::default());
    };
    let text = std::fs::read_to_string(path)?;
    let config = serde_json::from_str(&text)?;
    log::debug!("loaded viewer config from {}", path.display());
    Ok(config)
}

fn open_single(file: &Path) -> Result<H5Catalog> {
    let mut catalog = H5Catalog::new();
    catalog.open_new(file)?;
    Ok(catalog)
}

/// Apply the command-line overrides on top of the loaded config.
fn cut_config(
    mut config: ViewerConfig,
    seed: Option<SeedArg>,
    colormap: Option<ColormapArg>,
) -> ViewerConfig {
    if let Some(seed) = seed {
        let fit = config.fit.clone().with_seed(seed.into());
        config = config.with_fit(fit);
    }
    if let Some(colormap) = colormap {
        config = config.with_colormap(colormap.into());
    }
    config
}

/// Show `selection`, cut it along `request.rectangle` and render the JSON
/// report.
fn run_cut(
    selection: &DatasetSelection,
    config: ViewerConfig,
    request: &CutRequest,
) -> Result<String> {
    let rectangle = request.rectangle;
    let mut session = PlotSession::new(config, NullSink, LogNotifier);
    let outcome = selection.show(&mut session)?;
    session.apply_log(request.log);
    session.open_cut_view()?;

    if !matches!(
        session.commit_rectangle(rectangle),
        SelectionChange::Committed(_)
    ) {
        return Err(CliError::InvalidArgument(format!(
            "rectangle {:?} was not accepted",
            rectangle
        )));
    }
    if session.cut().and_then(|cut| cut.live()).is_none() {
        return Err(CliError::InvalidArgument(format!(
            "rectangle {:?} covers no data of {}",
            rectangle, selection.path
        )));
    }

    if request.freeze {
        session.freeze_cut()?;
    }
    let parameters = if request.fit {
        Some(session.run_fit()?)
    } else {
        None
    };

    let menu = session.menu();
    let (live, overlays) = session
        .cut()
        .map_or((None, &[][..]), |cut| (cut.live(), cut.overlays()));
    let report = CutReport {
        dataset: &selection.path,
        rectangle: session.rectangle().unwrap_or(rectangle),
        calibrated: outcome.calibrated,
        log: request.log,
        colormap: session.plot().colormap(),
        live,
        overlays,
        fit: parameters,
        menu,
    };
    let json = if request.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    Ok(json)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Tree { files } => {
            let mut catalog = H5Catalog::new();
            for file in &files {
                catalog.add(file)?;
            }
            for index in 0..catalog.len() {
                print!("{}", catalog.tree(index)?.render());
            }
        }

        Commands::Attrs { file, path } => {
            let catalog = open_single(&file)?;
            let attrs = catalog.attributes(0, &path)?;
            if attrs.is_empty() {
                println!("{}: no attributes", path);
            }
            for attr in attrs {
                println!(
                    "{:<20} {:<10} {:<8} {}",
                    attr.name,
                    format_shape(&attr.shape),
                    attr.dtype,
                    attr.value
                );
            }
        }

        Commands::Table {
            file,
            dataset,
            limit,
        } => {
            let catalog = open_single(&file)?;
            let table = catalog.table(0, &dataset)?;
            if table.is_empty() {
                println!("{}: empty table", dataset);
            } else {
                print!("{}", table.render(limit));
            }
        }

        Commands::Range { file, dataset, log } => {
            let catalog = open_single(&file)?;
            let selection = catalog.selection(0, &dataset)?;
            let mut session =
                PlotSession::new(ViewerConfig::default(), NullSink, LogNotifier);
            selection.show(&mut session)?;
            session.apply_log(log);
            let Some(ranges) = session.colormap_ranges() else {
                return Err(CliError::InvalidArgument(format!(
                    "{} is not a 2-D dataset",
                    dataset
                )));
            };
            println!("scale:   {}", if log { "log" } else { "linear" });
            println!("initial: {} .. {}", ranges.initial.min, ranges.initial.max);
            println!("whole:   {} .. {}", ranges.whole.min, ranges.whole.max);
        }

        Commands::Cut {
            file,
            dataset,
            rect,
            log,
            freeze,
            fit,
            seed,
            colormap,
            config,
            pretty,
        } => {
            let &[x1, y1, x2, y2] = rect.as_slice() else {
                return Err(CliError::InvalidArgument(
                    "--rect takes exactly four values".to_string(),
                ));
            };
            let config = cut_config(load_config(config.as_deref())?, seed, colormap);
            let catalog = open_single(&file)?;
            let selection = catalog.selection(0, &dataset)?;
            let request = CutRequest {
                rectangle: Rectangle::new(x1, y1, x2, y2),
                log,
                freeze,
                fit,
                pretty,
            };
            let json = run_cut(&selection, config, &request)?;
            println!("{}", json);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cut_args() {
        let cli = Cli::try_parse_from([
            "h5view", "cut", "f.h5", "/img", "--rect", "-1", "0", "2.5", "3", "--fit", "--seed",
            "peaks",
        ])
        .unwrap();
        match cli.command {
            Commands::Cut {
                rect, fit, seed, ..
            } => {
                assert_eq!(rect, vec![-1.0, 0.0, 2.5, 3.0]);
                assert!(fit);
                assert!(matches!(seed, Some(SeedArg::Peaks)));
            }
            _ => panic!("expected cut"),
        }
        assert!(Cli::try_parse_from(["h5view", "cut", "f.h5", "/img"]).is_err());
    }

    fn wide_request() -> CutRequest {
        CutRequest {
            rectangle: Rectangle::new(0.0, 0.0, 4.0, 1.0),
            log: false,
            freeze: false,
            fit: false,
            pretty: false,
        }
    }

    fn ramp_selection() -> DatasetSelection {
        let data = ndarray::Array2::from_shape_fn((5, 5), |(r, c)| (r * 5 + c) as f64);
        DatasetSelection::new("/img", data.into_dyn())
    }

    #[test]
    fn test_cut_reports_colormap() {
        let cli = Cli::try_parse_from([
            "h5view", "cut", "f.h5", "/img", "--rect", "0", "0", "4", "1", "--colormap", "hot",
        ])
        .unwrap();
        let Commands::Cut { seed, colormap, .. } = cli.command else {
            panic!("expected cut");
        };
        let config = cut_config(ViewerConfig::default(), seed, colormap);

        let json = run_cut(&ramp_selection(), config, &wide_request()).unwrap();
        let report: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(report["colormap"], "hot");
        assert_eq!(report["dataset"], "/img");
        assert_eq!(report["live"]["ordinate"], serde_json::json!([0.0, 1.0, 2.0, 3.0]));

        let json = run_cut(&ramp_selection(), ViewerConfig::default(), &wide_request()).unwrap();
        let report: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(report["colormap"], "viridis");
    }

    #[test]
    fn test_cut_rejects_empty_rectangle() {
        let request = CutRequest {
            rectangle: Rectangle::new(10.0, 10.0, 20.0, 12.0),
            ..wide_request()
        };
        let err = run_cut(&ramp_selection(), ViewerConfig::default(), &request).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }

    #[test]
    fn test_load_config() {
        assert_eq!(load_config(None).unwrap(), ViewerConfig::default());
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"min_span_px": 8.0, "fit": {"seed": "peaks"}}"#).unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.min_span_px, 8.0);
        assert_eq!(config.fit.seed, FitSeed::Peaks);
    }
}
