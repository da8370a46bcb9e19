use clap::{Parser, Subcommand, ValueEnum};
use folio::config::{load_config, parse_config};
use folio::watcher::FileWatcher;
use folio::{Document, FolioConfig, IndexedSource, Library, Position};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

/// folio CLI: table of contents, reading order and specials for a content tree
#[derive(Parser)]
#[command(name = "folio", version, about)]
struct Cli {
    /// Path to the content directory (default: current directory)
    #[arg(long, default_value = ".")]
    content_dir: PathBuf,

    /// Config file (default: <content-dir>/folio.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum PositionArg {
    Front,
    End,
}

impl From<PositionArg> for Position {
    fn from(arg: PositionArg) -> Self {
        match arg {
            PositionArg::Front => Position::Front,
            PositionArg::End => Position::End,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List normalized metadata for every page
    Pages,

    /// Show the grouped table of contents
    Toc,

    /// Show the reading order used for previous/next navigation
    Order,

    /// Get a navigable document by path
    Get {
        /// Document path (e.g. /crypto-high/sections/genesis/christmas)
        path: String,
    },

    /// Show the document after the given path
    Next {
        /// Document path
        path: String,
    },

    /// Show the document before the given path
    Prev {
        /// Document path
        path: String,
    },

    /// List front or end specials
    Specials {
        /// Position of the specials
        position: PositionArg,
    },

    /// List pages belonging to a group
    Group {
        /// Group id (the segment after the sections marker)
        id: String,
    },

    /// Show how a path is classified
    Classify {
        /// Document path
        path: String,
    },

    /// Show load state and document counts
    Status,

    /// Rescan the content directory and rebuild the index
    Rebuild,

    /// Watch the content directory and print the table of contents on change
    Watch,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        // Machine-readable error on stderr
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = read_config(&cli.content_dir, cli.config.as_deref())?;
    let source = Arc::new(IndexedSource::open(&cli.content_dir, &config)?);
    let library = Library::new(source.clone(), config.clone());
    library.init()?;

    match cli.command {
        Command::Pages => print_output(&library.pages(), &cli.format)?,

        Command::Toc => print_output(&library.toc(), &cli.format)?,

        Command::Order => print_output(&library.ordered(), &cli.format)?,

        Command::Get { path } => print_lookup(library.get(&path), &path, &cli.format)?,

        Command::Next { path } => print_lookup(library.next(&path), &path, &cli.format)?,

        Command::Prev { path } => print_lookup(library.prev(&path), &path, &cli.format)?,

        Command::Specials { position } => {
            print_output(&library.specials(position.into()), &cli.format)?
        }

        Command::Group { id } => print_output(&library.by_group(&id), &cli.format)?,

        Command::Classify { path } => {
            let kind = library.classify(&path);
            print_output(
                &serde_json::json!({
                    "path": path,
                    "classification": kind,
                    "group": library.classifier().infer_group(&path),
                }),
                &cli.format,
            )?
        }

        Command::Status => print_output(&library.status(), &cli.format)?,

        Command::Rebuild => {
            let count = source.rebuild()?;
            library.reset();
            library.init()?;
            print_output(
                &serde_json::json!({ "ok": true, "indexed": count }),
                &cli.format,
            )?
        }

        Command::Watch => {
            let watcher = FileWatcher::start(&cli.content_dir, &config)?;
            log::info!("Watching {}", cli.content_dir.display());
            print_output(&library.toc(), &cli.format)?;

            while let Some(events) = watcher.wait_for_changes() {
                log::info!("{} content file(s) changed, reloading", events.len());
                if let Err(e) = library.reload() {
                    log::error!("Reload failed: {e}");
                    continue;
                }
                print_output(&library.toc(), &cli.format)?;
            }
        }
    }

    Ok(())
}

fn read_config(
    content_dir: &Path,
    explicit: Option<&Path>,
) -> Result<FolioConfig, Box<dyn std::error::Error>> {
    let config = match explicit {
        Some(path) => parse_config(path)
            .map_err(|e| format!("Failed to read config '{}': {e}", path.display()))?,
        None => load_config(content_dir)?,
    };
    Ok(config)
}

fn print_lookup(
    doc: Option<Document>,
    path: &str,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match doc {
        Some(doc) => print_output(&doc, format),
        None => print_output(
            &serde_json::json!({ "path": path, "found": false }),
            format,
        ),
    }
}

fn print_output<T: Serialize + ?Sized>(
    value: &T,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}
