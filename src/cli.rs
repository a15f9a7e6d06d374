use crate::hmm::ModelKind;
use crate::utils::Result;
use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use once_cell::sync::Lazy;
use std::{
    io::Write,
    path::{Path, PathBuf},
};

pub static FULL_VERSION: Lazy<String> = Lazy::new(|| {
    format!(
        "{}-{}",
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    )
});

#[derive(Parser)]
#[command(name="barcall",
          author=env!("CARGO_PKG_AUTHORS"),
          version=&**FULL_VERSION,
          about=env!("CARGO_PKG_DESCRIPTION"),
          long_about = None,
          disable_help_subcommand = true,
          help_template = "{name} {version}\n{author}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = ArgAction::Count, help = "Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)")]
    pub verbosity: u8,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Accuracy across a sweep of chunk confidence cutoffs")]
    Sweep(SweepArgs),
    #[clap(about = "k-fold cross-validation of the consensus calling methods")]
    CrossValidate(CrossValidateArgs),
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("sweep")))]
#[command(arg_required_else_help(true))]
pub struct SweepArgs {
    #[clap(required = true)]
    #[clap(short = 'e')]
    #[clap(long = "events")]
    #[clap(help = "Ranked event list, one event per line (plain or gzipped)")]
    #[clap(value_name = "EVENTS")]
    #[arg(value_parser = check_file_exists)]
    pub events_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-prefix")]
    #[clap(help = "Prefix for output files")]
    #[clap(value_name = "OUTPUT_PREFIX")]
    #[arg(value_parser = check_prefix_path)]
    pub output_prefix: String,

    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = threads_in_range)]
    pub num_threads: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "steps")]
    #[clap(value_name = "STEPS")]
    #[clap(help = "Number of evenly spaced cutoffs in [0, 1)")]
    #[clap(default_value = "1000")]
    #[arg(value_parser = positive_count)]
    pub steps: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "window")]
    #[clap(value_name = "WINDOW")]
    #[clap(help = "Rolling window size used to smooth the accuracy series")]
    #[clap(default_value = "15")]
    #[arg(value_parser = positive_count)]
    pub window: usize,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("cross-validate")))]
#[command(arg_required_else_help(true))]
pub struct CrossValidateArgs {
    #[clap(required = true)]
    #[clap(short = 'e')]
    #[clap(long = "events-dir")]
    #[clap(help = "Directory with one JSON file per event")]
    #[clap(value_name = "EVENTS_DIR")]
    #[arg(value_parser = check_dir_exists)]
    pub events_dir: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'm')]
    #[clap(long = "model-dir")]
    #[clap(help = "Directory with the untrained model configurations")]
    #[clap(value_name = "MODEL_DIR")]
    #[arg(value_parser = check_dir_exists)]
    pub model_dir: PathBuf,

    #[clap(short = 's')]
    #[clap(long = "substep")]
    #[clap(help = "Use the substep model instead of the simple one")]
    pub substep: bool,

    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-prefix")]
    #[clap(help = "Prefix for output files")]
    #[clap(value_name = "OUTPUT_PREFIX")]
    #[arg(value_parser = check_prefix_path)]
    pub output_prefix: String,

    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = threads_in_range)]
    pub num_threads: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(short = 'k')]
    #[clap(long = "folds")]
    #[clap(value_name = "FOLDS")]
    #[clap(help = "Number of cross-validation folds")]
    #[clap(default_value = "5")]
    #[arg(value_parser = folds_in_range)]
    pub folds: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "cutoffs")]
    #[clap(value_name = "CUTOFFS")]
    #[clap(help = "Comma-separated chunk score cutoffs, evaluated in order")]
    #[clap(default_value = "0.9,0.8,0.7,0.6,0.5,0.4,0.3,0.2,0.1")]
    #[arg(value_parser = cutoffs_from_string)]
    pub cutoffs: Cutoffs,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "seed")]
    #[clap(value_name = "SEED")]
    #[clap(help = "Seed for fold assignment and random calls")]
    #[clap(default_value = "42")]
    pub seed: u64,
}

impl CrossValidateArgs {
    pub fn model_kind(&self) -> ModelKind {
        if self.substep {
            ModelKind::Substep
        } else {
            ModelKind::Simple
        }
    }
}

/// Cutoff list as parsed from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Cutoffs(pub Vec<f64>);

pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

fn check_prefix_path(s: &str) -> Result<String> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(format!("Path does not exist: {}", parent_dir.display()));
        }
    }
    Ok(s.to_string())
}

fn threads_in_range(s: &str) -> Result<usize> {
    let thread: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid thread number", s))?;
    if thread >= 1 {
        Ok(thread)
    } else {
        Err("Number of threads must be at least 1".into())
    }
}

fn folds_in_range(s: &str) -> Result<usize> {
    let folds: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid number of folds", s))?;
    if folds >= 2 {
        Ok(folds)
    } else {
        Err("Number of folds must be at least 2".into())
    }
}

fn positive_count(s: &str) -> Result<usize> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid count", s))?;
    if value >= 1 {
        Ok(value)
    } else {
        Err("Value must be at least 1".into())
    }
}

fn check_file_exists(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        Err(format!("File does not exist: {}", path.display()))
    } else {
        Ok(path.to_path_buf())
    }
}

fn check_dir_exists(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if !path.is_dir() {
        Err(format!("Directory does not exist: {}", path.display()))
    } else {
        Ok(path.to_path_buf())
    }
}

fn ensure_unit_float(s: &str) -> Result<f64> {
    let value = s
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("Could not parse float: {}", e))?;
    if !(0.0..=1.0).contains(&value) {
        Err(format!(
            "The value must be between 0.0 and 1.0, got: {}",
            value
        ))
    } else {
        Ok(value)
    }
}

fn cutoffs_from_string(s: &str) -> Result<Cutoffs> {
    let values = s
        .split(',')
        .map(ensure_unit_float)
        .collect::<Result<Vec<_>>>()?;
    if values.is_empty() {
        return Err("Expected at least one cutoff".into());
    }
    Ok(Cutoffs(values))
}
