//! Computer inventory command handlers.
//!
//! `computers list` drives the streaming loader: it subscribes to loader
//! snapshots, mirrors them into a progress display while the stream runs,
//! and renders the completed list in the selected output format.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tabled::Tabled;

use adcon_core::{Computer, Console, LoadState, LoaderSnapshot};

use crate::cli::{ComputersArgs, ComputersCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ComputerRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "LAPS")]
    laps: String,
}

fn to_row(c: &Arc<Computer>, color: bool) -> ComputerRow {
    let enabled = if c.enabled {
        if color { "yes".green().to_string() } else { "yes".into() }
    } else if color {
        "no".red().to_string()
    } else {
        "no".into()
    };
    ComputerRow {
        name: c.name.clone(),
        enabled,
        laps: if c.has_password() { "✓".into() } else { "-".into() },
    }
}

// ── Progress display ────────────────────────────────────────────────

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} loading computers {msg}")
            .expect("static template"),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Mirror a loader snapshot into the progress display.
///
/// Determinate bar once the total is known, spinner with a running count
/// otherwise.
fn update_progress(bar: &ProgressBar, snapshot: &LoaderSnapshot) {
    let received = u64::try_from(snapshot.received).unwrap_or(u64::MAX);
    match snapshot.expected_total {
        Some(total) => {
            if bar.length() != Some(total) {
                bar.set_style(
                    ProgressStyle::with_template(
                        "{bar:40} {pos}/{len} computers ({percent}%)",
                    )
                    .expect("static template"),
                );
                bar.set_length(total);
            }
            bar.set_position(received.min(total));
        }
        None => bar.set_message(format!("({received} received)")),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    console: &Console,
    args: ComputersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ComputersCommand::List {
            no_progress,
            enabled_only,
        } => {
            let loader = console.computer_loader();
            let mut rx = loader.subscribe();
            loader.start();

            let show_progress =
                !no_progress && !global.quiet && std::io::stderr().is_terminal();
            let bar = show_progress.then(progress_bar);

            let snapshot = loop {
                let snap = rx.borrow_and_update().clone();
                if let Some(ref bar) = bar {
                    update_progress(bar, &snap);
                }
                if snap.is_terminal() {
                    break snap;
                }
                if rx.changed().await.is_err() {
                    break rx.borrow().clone();
                }
            };

            if let Some(bar) = bar {
                bar.finish_and_clear();
            }

            if snapshot.state == LoadState::Failed {
                return Err(CliError::StreamFailed {
                    message: snapshot
                        .last_error
                        .unwrap_or_else(|| "unknown stream failure".into()),
                });
            }

            let computers: Vec<Arc<Computer>> = snapshot
                .computers
                .iter()
                .filter(|c| !enabled_only || c.enabled)
                .cloned()
                .collect();

            let printer = output::Printer::new(global);
            let color = printer.color();
            printer.list(&computers, |c| to_row(c, color), |c| c.name.clone())
        }
    }
}
