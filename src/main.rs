//! Terminal front end for quicklabel.
//!
//! Steps through one dataset type image by image. Digits label the current
//! image and advance; other commands are listed by `?`.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;

use quicklabel::config::{AppConfig, ConfigError, DatasetConfig, LogLevel};
use quicklabel::context::{ContextError, LabelingContext};
use quicklabel::model::ImageInfo;

/// Keyboard-driven image classification labeling.
#[derive(Parser)]
#[command(name = "quicklabel")]
#[command(version, about)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dataset type to label (defaults to the highest-priority one)
    #[arg(long)]
    dataset: Option<String>,

    /// Label images in this directory instead of the configured datasets
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Directory for annotations and session state
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Write the effective configuration back to the config file
    #[arg(long)]
    save_config: bool,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("Terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("No dataset configured; pass --dir or add one to the config file")]
    NoDataset,

    #[error("No config file path; pass --config")]
    NoConfigPath,
}

/// One parsed input line.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Label(u32),
    Skip,
    Undo,
    Redo,
    Next,
    Prev,
    Goto(usize),
    Stats,
    Refresh,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let head = parts.next()?;
        let command = match head {
            "s" | "skip" => Self::Skip,
            "u" | "undo" => Self::Undo,
            "r" | "redo" => Self::Redo,
            "n" | "next" => Self::Next,
            "p" | "prev" => Self::Prev,
            "g" | "goto" => Self::Goto(parts.next()?.parse().ok()?),
            "stats" => Self::Stats,
            "refresh" => Self::Refresh,
            "?" | "h" | "help" => Self::Help,
            "q" | "quit" => Self::Quit,
            digits => Self::Label(digits.parse().ok()?),
        };
        Some(command)
    }
}

const HELP: &str = "\
  <digit>   label current image and advance
  s         skip current image and advance
  u / r     undo / redo
  n / p     next / previous image
  g <N>     go to image N
  stats     show progress
  refresh   rescan image directories
  q         save and quit";

fn init_logging(level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(level.to_level_filter())
        .parse_default_env()
        .init();
}

fn print_image(info: &ImageInfo, total: usize) {
    println!(
        "[{}/{}] {} ({})",
        info.index + 1,
        total,
        info.filename,
        info.status
    );
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    if cli.debug {
        config.settings.log_level = LogLevel::Debug;
    }
    init_logging(config.settings.log_level);

    if let Some(data_dir) = cli.data_dir {
        config.settings.data_dir = data_dir;
    }
    if let Some(dir) = cli.dir {
        let name = cli.dataset.clone().unwrap_or_else(|| "default".to_string());
        config.datasets = vec![DatasetConfig::new(&name, dir)];
    }

    if cli.save_config {
        let path = cli
            .config
            .clone()
            .or_else(AppConfig::default_path)
            .ok_or(CliError::NoConfigPath)?;
        config.save_to(&path)?;
    }

    let dataset = match cli.dataset {
        Some(name) => name,
        None => config
            .datasets_by_priority()
            .first()
            .map(|d| d.name.clone())
            .ok_or(CliError::NoDataset)?,
    };

    let mut ctx = LabelingContext::open(config)?;
    let result = label_loop(&ctx, &dataset);
    ctx.shutdown()?;
    result
}

fn label_loop(ctx: &LabelingContext, dataset: &str) -> Result<(), CliError> {
    let mut total = ctx.image_count(dataset);
    if total == 0 {
        println!("No images found for '{}'", dataset);
        return Ok(());
    }

    let class_count = ctx.config().settings.class_count;
    let start = ctx.annotations().get_current_index(dataset).min(total - 1);
    if let Some(info) = ctx.navigate_to(dataset, start) {
        print_image(&info, total);
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        stdout.flush()?;
        let Some(line) = lines.next().transpose()? else {
            break;
        };
        let Some(command) = Command::parse(&line) else {
            if !line.trim().is_empty() {
                println!("Unknown command, ? for help");
            }
            continue;
        };

        let shown = match command {
            Command::Label(label) => {
                let Some(current) = ctx.current_image(dataset) else {
                    continue;
                };
                let result = ctx.annotations().annotate(dataset, &current.path, label);
                match result {
                    Ok(_) => ctx
                        .navigate_next(dataset)
                        .or_else(|| ctx.current_image(dataset)),
                    Err(e) => {
                        println!("{} (labels 0-{})", e, class_count.saturating_sub(1));
                        None
                    }
                }
            }
            Command::Skip => {
                let Some(current) = ctx.current_image(dataset) else {
                    continue;
                };
                let result = ctx.annotations().skip(dataset, &current.path);
                match result {
                    Ok(_) => ctx
                        .navigate_next(dataset)
                        .or_else(|| ctx.current_image(dataset)),
                    Err(e) => {
                        println!("{}", e);
                        None
                    }
                }
            }
            Command::Undo | Command::Redo => {
                let transition = if command == Command::Undo {
                    ctx.annotations().undo()
                } else {
                    ctx.annotations().redo()
                };
                match transition {
                    Some(t) => {
                        println!("{}", t.description());
                        let index = if t.dataset_type == dataset {
                            ctx.index_of(dataset, &t.image_path)
                        } else {
                            None
                        };
                        match index {
                            Some(index) => ctx.navigate_to(dataset, index),
                            None => ctx.current_image(dataset),
                        }
                    }
                    None => {
                        let verb = if command == Command::Undo { "undo" } else { "redo" };
                        println!("Nothing to {}", verb);
                        None
                    }
                }
            }
            Command::Next => ctx.navigate_next(dataset).or_else(|| {
                println!("Already at the last image");
                None
            }),
            Command::Prev => ctx.navigate_prev(dataset).or_else(|| {
                println!("Already at the first image");
                None
            }),
            Command::Goto(n) => ctx.navigate_to(dataset, n.saturating_sub(1)).or_else(|| {
                println!("No image {} (1-{})", n, total);
                None
            }),
            Command::Stats => {
                let progress = ctx.progress(dataset);
                println!(
                    "{}: {} labeled ({} positive, {} negative), {} skipped, {} pending, {:.1}% done",
                    progress.dataset_type,
                    progress.annotated_count,
                    progress.positive_count,
                    progress.negative_count,
                    progress.skipped_count,
                    progress.pending_count(),
                    progress.percent_done()
                );
                println!("Session: {}", ctx.annotations().get_session_stats());
                let labeled = ctx.annotations().dataset_types().join(", ");
                if !labeled.is_empty() {
                    println!("Dataset types with labels: {}", labeled);
                }
                None
            }
            Command::Refresh => {
                ctx.catalog().refresh_all();
                total = ctx.image_count(dataset);
                println!("Found {} images for '{}'", total, dataset);
                if total == 0 {
                    break;
                }
                let index = ctx.annotations().get_current_index(dataset).min(total - 1);
                ctx.navigate_to(dataset, index)
            }
            Command::Help => {
                println!("{}", HELP);
                None
            }
            Command::Quit => break,
        };

        if let Some(info) = shown {
            print_image(&info, total);
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("1"), Some(Command::Label(1)));
        assert_eq!(Command::parse(" s "), Some(Command::Skip));
        assert_eq!(Command::parse("g 12"), Some(Command::Goto(12)));
        assert_eq!(Command::parse("goto"), None);
        assert_eq!(Command::parse("refresh"), Some(Command::Refresh));
        assert_eq!(Command::parse("q"), Some(Command::Quit));
        assert_eq!(Command::parse("wat"), None);
        assert_eq!(Command::parse(""), None);
    }
}
