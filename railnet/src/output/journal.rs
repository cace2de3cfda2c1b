//! Human-readable per-actor logs.
//!
//! Every line goes to a named sink (one per train, one for the repair
//! vehicle, and a shared `system` sink) and is echoed through the `log`
//! facade, so console output follows the logger's level. A console journal
//! keeps no sinks at all.

use log::{info, warn};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

enum SinkOutput {
    Memory(Vec<String>),
    File(BufWriter<File>),
    Disabled,
}

enum Target {
    Console,
    Memory,
    Dir(PathBuf),
}

pub struct Journal {
    target: Target,
    sinks: BTreeMap<String, SinkOutput>,
}

impl Journal {
    /// Only echo to the logger.
    pub fn console() -> Journal {
        Journal { target: Target::Console, sinks: BTreeMap::new() }
    }

    /// Keep all lines in memory.
    pub fn in_memory() -> Journal {
        Journal { target: Target::Memory, sinks: BTreeMap::new() }
    }

    /// Write each sink to its own file in `dir`.
    pub fn to_dir(dir: &Path) -> io::Result<Journal> {
        fs::create_dir_all(dir)?;
        Ok(Journal { target: Target::Dir(dir.to_path_buf()), sinks: BTreeMap::new() })
    }

    pub fn record(&mut self, sink: &str, stamp: &str, text: &str) {
        info!("{}   {}", stamp, text);
        if let Target::Console = self.target {
            return;
        }
        let line = format!("{}   {}", stamp, text);

        if !self.sinks.contains_key(sink) {
            let output = self.open(sink);
            self.sinks.insert(sink.to_string(), output);
        }
        let output = match self.sinks.get_mut(sink) {
            Some(o) => o,
            None => return,
        };
        let failed = match output {
            SinkOutput::Memory(lines) => { lines.push(line); None },
            SinkOutput::File(w) => writeln!(w, "{}", line).err(),
            SinkOutput::Disabled => None,
        };
        if let Some(e) = failed {
            warn!("could not write log {:?}, disabling it: {}", sink, e);
            *output = SinkOutput::Disabled;
        }
    }

    fn open(&self, sink: &str) -> SinkOutput {
        match self.target {
            Target::Console => SinkOutput::Disabled,
            Target::Memory => SinkOutput::Memory(Vec::new()),
            Target::Dir(ref dir) => {
                let name: String = sink.chars()
                    .map(|c| if c == '/' || c == '\\' { '_' } else { c })
                    .collect();
                match File::create(dir.join(name)) {
                    Ok(f) => SinkOutput::File(BufWriter::new(f)),
                    Err(e) => {
                        warn!("could not create log {:?}, disabling it: {}", sink, e);
                        SinkOutput::Disabled
                    }
                }
            }
        }
    }

    /// Lines kept in memory for `sink`. Empty for file-backed sinks.
    pub fn lines(&self, sink: &str) -> &[String] {
        match self.sinks.get(sink) {
            Some(SinkOutput::Memory(lines)) => &lines[..],
            _ => &[],
        }
    }

    pub fn sink_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.sinks.keys().map(|s| s.as_str())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        for output in self.sinks.values_mut() {
            if let SinkOutput::File(w) = output {
                w.flush()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_kept_per_sink() {
        let mut j = Journal::in_memory();
        j.record("IC1", "2017-01-01 12:00", "IC1 has started");
        j.record("system", "2017-01-01 12:06", "Train IC1 has crashed");
        j.record("IC1", "2017-01-01 12:30", "IC1 is now on railway 0 -> 1");
        assert_eq!(j.lines("IC1"), &["2017-01-01 12:00   IC1 has started".to_string(),
                                     "2017-01-01 12:30   IC1 is now on railway 0 -> 1".to_string()]);
        assert_eq!(j.lines("system").len(), 1);
        assert!(j.lines("nobody").is_empty());
        assert_eq!(j.sink_names().collect::<Vec<_>>(), vec!["IC1", "system"]);
    }

    #[test]
    fn console_journal_keeps_nothing() {
        let mut j = Journal::console();
        for _ in 0..100 {
            j.record("IC1", "2017-01-01 12:00", "IC1 has started");
        }
        assert!(j.lines("IC1").is_empty());
        assert_eq!(j.sink_names().count(), 0);
        j.flush().unwrap();
    }

    #[test]
    fn writes_files_into_directory() {
        let dir = std::env::temp_dir().join(format!("railnet-journal-{}", std::process::id()));
        let mut j = Journal::to_dir(&dir).unwrap();
        j.record("Repair Vehicle", "2017-01-01 12:00", "ready");
        j.flush().unwrap();
        let contents = fs::read_to_string(dir.join("Repair Vehicle")).unwrap();
        assert_eq!(contents, "2017-01-01 12:00   ready\n");
        fs::remove_dir_all(&dir).unwrap();
    }
}
