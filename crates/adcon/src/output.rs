//! Output rendering for command results.
//!
//! Handlers build a [`Printer`] from the global options and hand it domain
//! values plus the projections the text formats need: a `Tabled` row for
//! tables and a one-line key for plain output. The structured formats
//! serialize the domain values themselves, so redaction choices made in
//! serde impls carry through unchanged.

use std::io::{self, IsTerminal, Write};

use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Renders command results in the format selected by `--output`.
pub struct Printer {
    format: OutputFormat,
    quiet: bool,
    color: bool,
}

impl Printer {
    pub fn new(global: &GlobalOpts) -> Self {
        Self {
            format: global.output.clone(),
            quiet: global.quiet,
            color: color_enabled(&global.color),
        }
    }

    /// Whether ANSI color is enabled for this invocation.
    pub fn color(&self) -> bool {
        self.color
    }

    /// Print a list of items. `row` projects an item into the table;
    /// `key` gives the one-per-line plain value.
    pub fn list<T, R>(
        &self,
        items: &[T],
        row: impl Fn(&T) -> R,
        key: impl Fn(&T) -> String,
    ) -> Result<(), CliError>
    where
        T: serde::Serialize,
        R: Tabled,
    {
        let rendered = self.render_list(items, row, key)?;
        self.emit(&rendered)
    }

    /// Print a single item. `detail` is the pre-formatted table view;
    /// `key` the scripting-friendly plain value.
    pub fn single<T>(
        &self,
        item: &T,
        detail: impl Fn(&T) -> String,
        key: impl Fn(&T) -> String,
    ) -> Result<(), CliError>
    where
        T: serde::Serialize,
    {
        let rendered = self.render_single(item, detail, key)?;
        self.emit(&rendered)
    }

    fn render_list<T, R>(
        &self,
        items: &[T],
        row: impl Fn(&T) -> R,
        key: impl Fn(&T) -> String,
    ) -> Result<String, CliError>
    where
        T: serde::Serialize,
        R: Tabled,
    {
        Ok(match self.format {
            OutputFormat::Table => Table::new(items.iter().map(row))
                .with(Style::rounded())
                .to_string(),
            OutputFormat::Plain => items.iter().map(key).collect::<Vec<_>>().join("\n"),
            _ => self.serialize(items)?,
        })
    }

    fn render_single<T>(
        &self,
        item: &T,
        detail: impl Fn(&T) -> String,
        key: impl Fn(&T) -> String,
    ) -> Result<String, CliError>
    where
        T: serde::Serialize,
    {
        Ok(match self.format {
            OutputFormat::Table => detail(item),
            OutputFormat::Plain => key(item),
            _ => self.serialize(item)?,
        })
    }

    fn serialize<T: serde::Serialize + ?Sized>(&self, value: &T) -> Result<String, CliError> {
        Ok(match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
            OutputFormat::JsonCompact => serde_json::to_string(value)?,
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            OutputFormat::Table | OutputFormat::Plain => String::new(),
        })
    }

    fn emit(&self, rendered: &str) -> Result<(), CliError> {
        if self.quiet || rendered.is_empty() {
            return Ok(());
        }
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", rendered.trim_end())?;
        Ok(())
    }
}

fn color_enabled(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}
