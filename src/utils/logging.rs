use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Install a tracing subscriber that writes to `path`.
///
/// The terminal UI owns stdout, so diagnostics only go to a file. Without a
/// path nothing is installed and `tracing` macros are no-ops. `RUST_LOG`
/// overrides the default `stitchperfect=debug` filter.
pub fn init_tracing(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(());
    };

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stitchperfect=debug,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|err| err as Box<dyn std::error::Error>)?;
    Ok(())
}

/// Plain-text copy of the conversation, appended as messages finish.
///
/// User lines are prefixed with the customer's name, model replies are
/// written as-is, and bookkeeping notes start with `## `. Each entry is
/// followed by a blank line. Write failures are logged and otherwise ignored
/// so they never interrupt the chat.
#[derive(Debug, Default)]
pub struct TranscriptLog {
    file_path: Option<PathBuf>,
}

impl TranscriptLog {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Enable logging to `path`, checking up front that it is writable.
    pub fn to_file(path: impl Into<PathBuf>) -> Result<Self, std::io::Error> {
        let path = path.into();
        Self::open(&path)?.flush()?;
        Ok(Self {
            file_path: Some(path),
        })
    }

    pub fn log_user(&self, customer_name: &str, text: &str) {
        self.append(&format!("{customer_name}: {text}"));
    }

    pub fn log_model(&self, text: &str) {
        if !text.is_empty() {
            self.append(text);
        }
    }

    pub fn log_note(&self, note: &str) {
        self.append(&format!("## {note}"));
    }

    fn open(path: &Path) -> Result<File, std::io::Error> {
        OpenOptions::new().create(true).append(true).open(path)
    }

    fn append(&self, content: &str) {
        let Some(path) = &self.file_path else {
            return;
        };
        if let Err(err) = Self::write_entry(path, content) {
            warn!(error = %err, path = %path.display(), "failed to write transcript log");
        }
    }

    fn write_entry(path: &Path, content: &str) -> Result<(), std::io::Error> {
        let mut writer = BufWriter::new(Self::open(path)?);
        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }
        writeln!(writer)?;
        writer.flush()
    }
}
