use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::warn;

/// How much of each hub exchange goes into the message log.
pub enum MessageLogMode {
    /// Response bodies are written out (as JSON when they parse).
    Full,
    /// Only status codes and body sizes.
    Compact,
}

pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self { mode, file })
    }

    pub fn log_request(&mut self, method: &str, path: &str) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "req",
            "method": method,
            "path": path,
        });
        self.write_line(&entry);
    }

    pub fn log_command(&mut self, item: &str, command: &str) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "cmd",
            "item": item,
            "command": command,
        });
        self.write_line(&entry);
    }

    pub fn log_response(&mut self, path: &str, status: u16, body: &str) {
        let entry = match self.mode {
            MessageLogMode::Full => {
                let body: Value = serde_json::from_str(body).unwrap_or_else(|_| Value::from(body));
                json!({
                    "ts": Utc::now().to_rfc3339(),
                    "dir": "resp",
                    "path": path,
                    "status": status,
                    "body": body,
                })
            }
            MessageLogMode::Compact => json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "resp",
                "path": path,
                "status": status,
                "bytes": body.len(),
            }),
        };
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
