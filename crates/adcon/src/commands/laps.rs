//! LAPS command handlers.

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use secrecy::ExposeSecret;

use adcon_core::{Console, LapsPassword};

use crate::cli::{GlobalOpts, LapsArgs, LapsCommand};
use crate::error::CliError;
use crate::output;

/// Serializable view of a retrieved LAPS password.
///
/// Exposing the password is the purpose of this command, so the structured
/// formats carry it in the clear. The redacted `Computer` serialization is
/// for the inventory listing, not here.
#[derive(serde::Serialize)]
struct LapsView {
    computer: String,
    password: String,
    expires_at: Option<DateTime<Utc>>,
}

impl LapsView {
    fn new(laps: &LapsPassword) -> Self {
        Self {
            computer: laps.computer.clone(),
            password: laps.password.expose_secret().to_owned(),
            expires_at: laps.expires_at,
        }
    }
}

fn detail(view: &LapsView, color: bool) -> String {
    let mut lines = vec![
        format!("Computer: {}", view.computer),
        format!("Password: {}", view.password),
    ];
    if let Some(expires) = view.expires_at {
        let expiry = expires.format("%Y-%m-%d %H:%M UTC").to_string();
        if expires < Utc::now() && color {
            lines.push(format!("Expires:  {} (expired)", expiry.red()));
        } else if expires < Utc::now() {
            lines.push(format!("Expires:  {expiry} (expired)"));
        } else {
            lines.push(format!("Expires:  {expiry}"));
        }
    }
    lines.join("\n")
}

pub async fn handle(console: &Console, args: LapsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        LapsCommand::Get { computer } => {
            let laps = console.laps_password(&computer).await?;
            let view = LapsView::new(&laps);

            let printer = output::Printer::new(global);
            let color = printer.color();
            printer.single(
                &view,
                |v| detail(v, color),
                // Plain format emits just the password for scripting.
                |v| v.password.clone(),
            )
        }
    }
}
