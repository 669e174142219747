//! # Event Sink
//!
//! Append-only CSV log of every `SEND`/`RECEIVE` event, flushed after each
//! record. This is the node's one durable side effect besides the
//! datagrams it emits, and the one the end-to-end scenarios assert
//! against. Distinct from structured `tracing` logging (`node/src/logging.rs`),
//! which is operational, not protocol-level.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    Send,
    Receive,
}

impl SinkEvent {
    fn as_str(&self) -> &'static str {
        match self {
            SinkEvent::Send => "SEND",
            SinkEvent::Receive => "RECEIVE",
        }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to open event log at {0}: {1}")]
    Open(PathBuf, std::io::Error),
    #[error("failed to write event record: {0}")]
    Write(#[from] std::io::Error),
}

/// Writes `timestamp_ms,event,msg_type,msg_id` lines to `node_<port>.log`.
pub struct EventSink {
    file: Mutex<File>,
}

impl EventSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| SinkError::Open(path.to_path_buf(), e))?;
        Ok(EventSink {
            file: Mutex::new(file),
        })
    }

    /// Default log file name for a node listening on `port`, per the
    /// external interface's `node_<port>.log` convention.
    pub fn default_path_for_port(port: u16) -> PathBuf {
        PathBuf::from(format!("node_{port}.log"))
    }

    pub fn record(
        &self,
        timestamp_ms: u64,
        event: SinkEvent,
        msg_type: &str,
        msg_id: &str,
    ) -> Result<(), SinkError> {
        let line = format!("{},{},{},{}\n", timestamp_ms, event.as_str(), msg_type, msg_id);
        let mut file = self.file.lock().expect("event sink mutex poisoned");
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn record_appends_csv_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node_9001.log");
        let sink = EventSink::open(&path).unwrap();
        sink.record(123, SinkEvent::Receive, "GOSSIP", "m1").unwrap();
        sink.record(456, SinkEvent::Send, "PING", "p1").unwrap();

        let mut contents = String::new();
        File::open(&path).unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "123,RECEIVE,GOSSIP,m1\n456,SEND,PING,p1\n");
    }

    #[test]
    fn default_path_uses_port_convention() {
        assert_eq!(EventSink::default_path_for_port(9001), PathBuf::from("node_9001.log"));
    }
}
