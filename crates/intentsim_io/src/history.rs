use crate::error::{IoError, Result};
use chrono::Utc;
use intentsim_data::LiveEvent;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const JOURNAL_FILE: &str = "events.jsonl";

/// One line of the journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    /// Wall-clock time in RFC 3339.
    pub recorded_at: String,
    pub tick: u64,
    pub event: LiveEvent,
}

/// Append-only JSONL log of simulation events.
pub struct EventJournal {
    file: Option<BufWriter<File>>,
    path: PathBuf,
    written: u64,
}

impl EventJournal {
    /// Opens `<dir>/events.jsonl` for appending, creating the directory if needed.
    pub fn new_at<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| {
            IoError::FileSystem(e).with_context(format!("creating journal directory {:?}", dir))
        })?;
        let path = dir.join(JOURNAL_FILE);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| IoError::FileSystem(e).with_context(format!("opening {:?}", path)))?;
        Ok(Self {
            file: Some(BufWriter::new(file)),
            path,
            written: 0,
        })
    }

    /// A journal that discards everything.
    #[must_use]
    pub fn new_dummy() -> Self {
        Self {
            file: None,
            path: PathBuf::new(),
            written: 0,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn log_event(&mut self, event: &LiveEvent) -> Result<()> {
        if let Some(ref mut file) = self.file {
            let entry = JournalEntry {
                recorded_at: Utc::now().to_rfc3339(),
                tick: event.tick(),
                event: event.clone(),
            };
            let json = serde_json::to_string(&entry)?;
            writeln!(file, "{}", json)?;
            file.flush()?;
            self.written += 1;
        }
        Ok(())
    }

    pub fn log_all(&mut self, events: &[LiveEvent]) -> Result<()> {
        events.iter().try_for_each(|e| self.log_event(e))
    }

    /// Reads every well-formed entry; malformed lines are skipped.
    pub fn read_all<P: AsRef<Path>>(path: P) -> Result<Vec<JournalEntry>> {
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(IoError::FileSystem(e)
                    .with_context(format!("reading journal {:?}", path.as_ref())))
            }
        };
        let reader = BufReader::new(file);
        Ok(reader
            .lines()
            .map_while(std::result::Result::ok)
            .filter_map(|line| serde_json::from_str::<JournalEntry>(&line).ok())
            .collect())
    }
}
