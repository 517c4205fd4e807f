use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

pub enum MessageLogMode {
    /// Log outbound commands, received chunks, and connectivity changes.
    Full,
    /// Log outbound commands and connectivity changes only.
    CommandsOnly,
}

pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { mode, file })
    }

    pub fn log_tx(&mut self, command: &str) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "tx",
            "command": command,
        });
        self.write_line(&entry);
    }

    pub fn log_rx(&mut self, chunk: &str) {
        if matches!(self.mode, MessageLogMode::CommandsOnly) {
            return;
        }
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "rx",
            "chunk": chunk,
        });
        self.write_line(&entry);
    }

    pub fn log_connection(&mut self, connected: bool) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "status",
            "connected": connected,
        });
        self.write_line(&entry);
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::NamedTempFile;

    fn read_lines(path: &str) -> Vec<Value> {
        let mut contents = String::new();
        std::fs::File::open(path)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn log_tx_writes_ndjson() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        logger.log_tx("ls2");

        let lines = read_lines(path);
        assert_eq!(lines[0]["dir"], "tx");
        assert_eq!(lines[0]["command"], "ls2");
        assert!(lines[0]["ts"].as_str().is_some());
    }

    #[test]
    fn commands_only_skips_rx() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::CommandsOnly, path).unwrap();
        logger.log_rx("L1.100 ON  062.4F 080.6F High Cool OK   - 1\r\n");
        logger.log_tx("on L1.100");

        let lines = read_lines(path);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["dir"], "tx");
    }

    #[test]
    fn full_mode_logs_rx_and_status() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        logger.log_connection(true);
        logger.log_rx("OK\r\n");
        logger.log_connection(false);

        let lines = read_lines(path);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["dir"], "status");
        assert_eq!(lines[0]["connected"], true);
        assert_eq!(lines[1]["chunk"], "OK\r\n");
        assert_eq!(lines[2]["connected"], false);
    }
}
