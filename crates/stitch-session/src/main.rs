use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use stitch_parse::WireFormat;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

mod display;
mod session;
mod source;

use session::{CancelFlag, Session};
use source::{ChunkSource, StdinSource, TextSource};

#[derive(Parser)]
#[command(
    name = "stitch",
    about = "Parse streamed LLM edit responses and apply them to a working tree"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Apply a single model response (from a file, or streamed on stdin)
    Apply {
        /// Session root the edits are confined to
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Wire format: block, lines, udiff, json
        #[arg(long, default_value = "block")]
        format: String,

        /// Parse and display without touching the tree
        #[arg(long)]
        dry_run: bool,

        /// Emit the per-file report as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Saved response file; reads stdin when omitted
        response: Option<PathBuf>,
    },

    /// Interactive session: turn <file>, undo, redo, undo-all, format <f>, quit
    Run {
        #[arg(long, default_value = ".")]
        root: PathBuf,

        #[arg(long, default_value = "block")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging goes to stderr; stdout belongs to the display stream.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Apply {
            root,
            format,
            dry_run,
            json,
            response,
        } => {
            let format = WireFormat::from_str(&format)?;
            let mut session = Session::new(root, format)?;
            let mut source: Box<dyn ChunkSource> = match response {
                Some(path) => Box::new(TextSource::new(std::fs::read_to_string(path)?, 64)),
                None => Box::new(StdinSource::new()),
            };

            // Ctrl-C trips the cooperative flag; the turn finalizes with
            // the edits that had already closed.
            let cancel = CancelFlag::new();
            let watcher = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("interrupt requested; finishing with completed edits");
                    watcher.cancel();
                }
            });

            let (tx, rx) = mpsc::unbounded_channel();
            let renderer = tokio::spawn(display::run_display(rx));
            let outcome = session.run_turn(source.as_mut(), &tx, &cancel, dry_run).await;
            drop(tx);
            let _ = renderer.await;

            let outcome = outcome?;
            if outcome.interrupted {
                eprintln!("stream interrupted; only fully parsed edits were considered");
            }
            match &outcome.report {
                Some(report) if json => println!("{}", serde_json::to_string_pretty(report)?),
                Some(report) => {
                    println!(
                        "applied {} file(s), {} failed",
                        report.applied_count(),
                        report.failed_count()
                    );
                }
                None => println!(
                    "{} edit(s) parsed, nothing applied{}",
                    outcome.edit_count,
                    if dry_run { " (dry run)" } else { "" }
                ),
            }
        }

        Commands::Run { root, format } => {
            let format = WireFormat::from_str(&format)?;
            let mut session = Session::new(root, format)?;
            run_repl(&mut session).await?;
        }
    }

    Ok(())
}

async fn run_repl(session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    eprintln!("stitch session at {} (format: {})", session.workspace().root().display(), session.format());
    eprintln!("commands: turn <response-file> | undo | redo | undo-all | format <name> | quit");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = match line.split_once(' ') {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };

        match command {
            "" => {}
            "quit" | "exit" => break,
            "format" => match WireFormat::from_str(rest) {
                Ok(format) => {
                    session.set_format(format);
                    eprintln!("format set to {format}");
                }
                Err(e) => eprintln!("{e}"),
            },
            "turn" => {
                let text = match std::fs::read_to_string(rest) {
                    Ok(text) => text,
                    Err(e) => {
                        eprintln!("cannot read {rest}: {e}");
                        continue;
                    }
                };
                let mut source = TextSource::new(text, 64);
                let (tx, rx) = mpsc::unbounded_channel();
                let renderer = tokio::spawn(display::run_display(rx));
                let result = session
                    .run_turn(&mut source, &tx, &CancelFlag::new(), false)
                    .await;
                drop(tx);
                let _ = renderer.await;
                match result {
                    Ok(outcome) => match outcome.report {
                        Some(report) => eprintln!(
                            "applied {} file(s), {} failed ({} undoable turn(s))",
                            report.applied_count(),
                            report.failed_count(),
                            session.history_depth()
                        ),
                        None => eprintln!("no edits to apply"),
                    },
                    Err(e) => eprintln!("turn failed: {e}"),
                }
            }
            "undo" => match session.undo() {
                Some(report) => print_undo("undo", &report),
                None => eprintln!("nothing to undo"),
            },
            "redo" => match session.redo() {
                Some(report) => print_undo("redo", &report),
                None => eprintln!("nothing to redo"),
            },
            "undo-all" => {
                let reports = session.undo_all();
                if reports.is_empty() {
                    eprintln!("nothing to undo");
                }
                for report in &reports {
                    print_undo("undo", report);
                }
            }
            other => eprintln!("unknown command: {other}"),
        }
    }

    Ok(())
}

fn print_undo(verb: &str, report: &stitch_apply::UndoReport) {
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    eprintln!(
        "{verb}: {} file(s) restored, {} failed",
        report.report.applied_count(),
        report.report.failed_count()
    );
}
