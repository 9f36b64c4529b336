//! User lookup command handlers.

use tabled::Tabled;

use adcon_core::{Console, DirectoryUser};

use crate::cli::{GlobalOpts, UsersArgs, UsersCommand};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Locked")]
    locked: String,
    #[tabled(rename = "Mail")]
    mail: String,
}

impl From<&DirectoryUser> for UserRow {
    fn from(u: &DirectoryUser) -> Self {
        Self {
            account: u.account_name.clone(),
            name: u.display_name.clone().unwrap_or_default(),
            enabled: if u.enabled { "yes".into() } else { "no".into() },
            locked: if u.locked { "yes".into() } else { "-".into() },
            mail: u.mail.clone().unwrap_or_default(),
        }
    }
}

fn detail(u: &DirectoryUser) -> String {
    let mut lines = vec![
        format!("Account: {}", u.account_name),
        format!("Name:    {}", u.display_name.as_deref().unwrap_or("-")),
        format!("DN:      {}", u.distinguished_name),
        format!("Enabled: {}", if u.enabled { "yes" } else { "no" }),
        format!("Locked:  {}", if u.locked { "yes" } else { "no" }),
        format!("Mail:    {}", u.mail.as_deref().unwrap_or("-")),
    ];
    if let Some(guid) = u.guid {
        lines.push(format!("GUID:    {guid}"));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(console: &Console, args: UsersArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        UsersCommand::Search { query } => {
            let users = console.search_users(&query).await?;
            output::Printer::new(global).list(&users, |u| UserRow::from(u), |u| u.account_name.clone())
        }

        UsersCommand::Get { user } => {
            let found = console.get_user(&user).await?;
            output::Printer::new(global).single(&found, detail, |u| u.account_name.clone())
        }
    }
}
