use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::warn;

pub enum MessageLogMode {
    /// Every response body is written.
    Full,
    /// A response body is written only when it differs from the previous
    /// body seen for the same operation.
    Changed,
}

pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
    previous_bodies: HashMap<&'static str, String>,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            mode,
            file,
            previous_bodies: HashMap::new(),
        })
    }

    /// `url` must already be redacted.
    pub fn log_request(&mut self, operation: &str, url: &str) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "req",
            "op": operation,
            "url": url,
        });
        self.write_line(&entry);
    }

    pub fn log_command(&mut self, action: &str, device: &str, payload: &str) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "cmd",
            "action": action,
            "device": device,
            "payload": payload,
        });
        self.write_line(&entry);
    }

    pub fn log_response(&mut self, operation: &'static str, status: u16, body: &str) {
        let unchanged = match self.mode {
            MessageLogMode::Full => false,
            MessageLogMode::Changed => {
                let same = self
                    .previous_bodies
                    .get(operation)
                    .is_some_and(|prev| prev == body);
                if !same {
                    self.previous_bodies.insert(operation, body.to_string());
                }
                same
            }
        };

        let entry = if unchanged {
            json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "resp",
                "op": operation,
                "status": status,
                "unchanged": true,
            })
        } else {
            json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "resp",
                "op": operation,
                "status": status,
                "body": body,
            })
        };
        self.write_line(&entry);
    }

    pub fn log_snapshot(&mut self, kind: &str, snapshot: Value) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "snapshot",
            "kind": kind,
            "state": snapshot,
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
    fn log_request_writes_ndjson() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        logger.log_request("read_attributes", "http://gw/getDeviceAttributesWithValues?secToken=***");

        let lines = read_lines(path);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["dir"], "req");
        assert_eq!(lines[0]["op"], "read_attributes");
        assert!(lines[0]["ts"].as_str().is_some());
    }

    #[test]
    fn full_mode_writes_every_body() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        logger.log_response("read_attributes", 200, "<r/>");
        logger.log_response("read_attributes", 200, "<r/>");

        let lines = read_lines(path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["body"], "<r/>");
    }

    #[test]
    fn changed_mode_elides_repeated_bodies_per_operation() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Changed, path).unwrap();
        logger.log_response("read_attributes", 200, "<a/>");
        logger.log_response("prime_read", 200, "<a/>");
        logger.log_response("read_attributes", 200, "<a/>");
        logger.log_response("read_attributes", 200, "<b/>");

        let lines = read_lines(path);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["body"], "<a/>");
        assert_eq!(lines[1]["body"], "<a/>");
        assert_eq!(lines[2]["unchanged"], true);
        assert!(lines[2].get("body").is_none());
        assert_eq!(lines[3]["body"], "<b/>");
    }

    #[test]
    fn log_command_captures_device() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        logger.log_command("set_preset", "AB12", "!AB12(01");

        let lines = read_lines(path);
        assert_eq!(lines[0]["dir"], "cmd");
        assert_eq!(lines[0]["action"], "set_preset");
        assert_eq!(lines[0]["device"], "AB12");
        assert_eq!(lines[0]["payload"], "!AB12(01");
    }

    #[test]
    fn log_snapshot_embeds_state() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        logger.log_snapshot("hot_water", json!({"id": "2569", "on": true}));

        let lines = read_lines(path);
        assert_eq!(lines[0]["kind"], "hot_water");
        assert_eq!(lines[0]["state"]["on"], true);
    }
}
