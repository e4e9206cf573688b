//! The append-only JSON transaction log.
//!
//! Each segment is a single well-formed JSON array. The writer keeps it
//! well-formed across every append by truncating the trailing `\n]` and
//! rewriting `,\n<record>\n]` in its place — so a crash between writes
//! leaves either the previous, complete array or a file truncated mid
//! rewrite (never a dangling comma with no closing bracket half-written,
//! since the truncate and the append happen against the same open handle
//! before syncing).

use crate::log_info::{LogFileInfo, TxRange};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use serde_json::{Map, Value};
use tracing::{debug, info};
use txm_core::{Error, Result, TxId};

/// Name of the status file, relative to the system directory.
pub const STATUS_FILE_NAME: &str = "txmgr.json";
/// Name of the current (always-open) log segment.
pub const CURRENT_LOG_NAME: &str = "txlog.json";

/// Closing bytes every well-formed segment ends with.
const TAIL: &[u8] = b"\n]";

/// Configuration for log rotation.
#[derive(Copy, Clone, Debug)]
pub struct LogConfig {
    /// Byte size threshold past which a commit append triggers rotation.
    ///
    /// The spec calls out 1000 bytes as a test-time value; production
    /// embeddings should pick something in the megabyte range. See
    /// `DESIGN.md` for the default chosen here.
    pub max_log_size: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { max_log_size: 8 * 1024 * 1024 }
    }
}

fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// The durable, rotating, append-only transaction log.
pub struct LogWriter {
    dir: PathBuf,
    file: File,
    config: LogConfig,
    /// Oldest first; the last entry always describes the currently-open
    /// segment (matches `self.file`).
    log_infos: Vec<LogFileInfo>,
}

impl LogWriter {
    /// Directory this log lives in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Segment index, oldest first, last entry is the current segment.
    pub fn log_infos(&self) -> &[LogFileInfo] {
        &self.log_infos
    }

    /// Byte size of the currently-open segment.
    pub fn current_size(&self) -> u64 {
        self.log_infos.last().map(|i| i.size).unwrap_or(0)
    }

    /// Create a brand-new log in `dir`: a fresh `txlog.json` containing
    /// only a `created` marker, and a matching status file. Fails if a
    /// current segment already exists.
    pub fn create(dir: &Path, config: LogConfig, prev_tx: TxId) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let current_path = dir.join(CURRENT_LOG_NAME);
        if current_path.exists() {
            return Err(Error::IllegalState(format!(
                "{} already exists; use open() or recovery",
                current_path.display()
            )));
        }

        let created = serde_json::json!({
            "_op": "created",
            "_ts": now_iso(),
            "_prev_tx": prev_tx,
        });
        let body = serde_json::to_vec(&created)?;
        let mut contents = Vec::with_capacity(body.len() + 4);
        contents.extend_from_slice(b"[\n");
        contents.extend_from_slice(&body);
        contents.extend_from_slice(TAIL);

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(&current_path)?;
        file.write_all(&contents)?;
        file.sync_all()?;

        let info = LogFileInfo {
            name: CURRENT_LOG_NAME.to_string(),
            tx_ids: TxRange::empty_starting_at(prev_tx + 1),
            size: contents.len() as u64,
            timestamp: now_iso(),
        };

        let writer = Self { dir: dir.to_path_buf(), file, config, log_infos: vec![info] };
        writer.write_status_file()?;
        info!(dir = %dir.display(), "created new transaction log");
        Ok(writer)
    }

    /// Open an existing, known-consistent log. `log_infos` is the index
    /// recovered or loaded from the status file; the last entry must name
    /// the file this opens as current.
    pub fn open(dir: &Path, config: LogConfig, log_infos: Vec<LogFileInfo>) -> Result<Self> {
        let current = log_infos.last().ok_or_else(|| {
            Error::IllegalState("cannot open a log with an empty segment index".into())
        })?;
        let current_path = dir.join(&current.name);
        let file = OpenOptions::new().read(true).write(true).open(&current_path)?;

        let mut writer = Self { dir: dir.to_path_buf(), file, config, log_infos };
        writer.append_meta("opened", Map::new())?;
        info!(dir = %dir.display(), "opened existing transaction log");
        Ok(writer)
    }

    /// Append a transaction commit record. `record` must already carry the
    /// `_tx`/`_ts` keys and the per-store seal fragments (see spec §4.7);
    /// this only handles the log-file mechanics: appending the bytes,
    /// extending the segment's tracked range, and rotating if the segment
    /// has grown past the configured threshold.
    pub fn append_commit(&mut self, record: Value, commit_id: TxId) -> Result<()> {
        self.append_raw(&record)?;
        let info = self.log_infos.last_mut().expect("segment index is never empty");
        info.tx_ids.extend(commit_id);
        info.size = self.file.stream_position()?;
        self.write_status_file()?;

        if info.size > self.config.max_log_size {
            self.rotate(commit_id)?;
        }
        Ok(())
    }

    /// Append a meta record (`created`, `opened`, `closed`, `archived`,
    /// `recovered`) with `op` and any extra fields, without touching the
    /// segment's commit-id range.
    pub fn append_meta(&mut self, op: &str, mut fields: Map<String, Value>) -> Result<()> {
        fields.insert("_op".to_string(), Value::String(op.to_string()));
        fields.insert("_ts".to_string(), Value::String(now_iso()));
        let record = Value::Object(fields);
        self.append_raw(&record)?;
        let info = self.log_infos.last_mut().expect("segment index is never empty");
        info.size = self.file.stream_position()?;
        self.write_status_file()
    }

    /// Truncate the trailing `\n]`, write `,\n<record>\n]` in its place,
    /// and fsync. Leaves the file positioned at EOF.
    fn append_raw(&mut self, value: &Value) -> Result<()> {
        let body = serde_json::to_vec(value)?;
        let len = self.file.seek(SeekFrom::End(0))?;
        debug_assert!(len >= TAIL.len() as u64, "segment is smaller than its own closing bracket");
        self.file.set_len(len - TAIL.len() as u64)?;
        self.file.seek(SeekFrom::End(0))?;

        let mut out = Vec::with_capacity(body.len() + 4);
        out.extend_from_slice(b",\n");
        out.extend_from_slice(&body);
        out.extend_from_slice(TAIL);
        self.file.write_all(&out)?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Archive the current segment and start a fresh one.
    fn rotate(&mut self, last_committed: TxId) -> Result<()> {
        self.append_meta("archived", Map::new())?;

        let archive_ts = now_iso();
        let archive_name = format!("txlog_{archive_ts}.json");
        let current_path = self.dir.join(CURRENT_LOG_NAME);
        let archive_path = self.dir.join(&archive_name);

        self.file.sync_all()?;
        std::fs::rename(&current_path, &archive_path)?;

        {
            let info = self.log_infos.last_mut().expect("segment index is never empty");
            info.name = archive_name.clone();
            info.timestamp = archive_ts;
        }

        let created = serde_json::json!({
            "_op": "created",
            "_ts": now_iso(),
            "_prev_tx": last_committed,
        });
        let body = serde_json::to_vec(&created)?;
        let mut contents = Vec::with_capacity(body.len() + 4);
        contents.extend_from_slice(b"[\n");
        contents.extend_from_slice(&body);
        contents.extend_from_slice(TAIL);

        let mut new_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(&current_path)?;
        new_file.write_all(&contents)?;
        new_file.sync_all()?;
        self.file = new_file;

        self.log_infos.push(LogFileInfo {
            name: CURRENT_LOG_NAME.to_string(),
            tx_ids: TxRange::empty_starting_at(last_committed + 1),
            size: contents.len() as u64,
            timestamp: now_iso(),
        });

        self.write_status_file()?;
        debug!(archived = %archive_name, "rotated transaction log");
        Ok(())
    }

    /// Append a `closed` meta record; called once the manager has fully
    /// drained during `disable`/`close`.
    pub fn close(&mut self) -> Result<()> {
        self.append_meta("closed", Map::new())
    }

    /// Rewrite `txmgr.json` atomically (write to a temp file, then
    /// rename over the target).
    pub fn write_status_file(&self) -> Result<()> {
        write_status_file(&self.dir, &self.log_infos)
    }
}

/// Rewrite the status file for `dir` with `log_infos`, atomically.
pub fn write_status_file(dir: &Path, log_infos: &[LogFileInfo]) -> Result<()> {
    let tmp_path = dir.join(format!("{STATUS_FILE_NAME}.tmp"));
    let final_path = dir.join(STATUS_FILE_NAME);
    let body = serde_json::to_vec_pretty(log_infos)?;
    {
        let mut tmp = OpenOptions::new().create(true).write(true).truncate(true).open(&tmp_path)?;
        tmp.write_all(&body)?;
        tmp.sync_all()?;
    }
    std::fs::rename(&tmp_path, &final_path)?;
    Ok(())
}

/// Read and parse the status file for `dir`, if present.
pub fn read_status_file(dir: &Path) -> Result<Option<Vec<LogFileInfo>>> {
    let path = dir.join(STATUS_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }
    let mut contents = String::new();
    File::open(&path)?.read_to_string(&mut contents)?;
    match serde_json::from_str(&contents) {
        Ok(infos) => Ok(Some(infos)),
        Err(e) => {
            tracing::warn!(error = %e, "status file did not parse");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_writes_minimal_valid_array() {
        let dir = tempdir().unwrap();
        let writer = LogWriter::create(dir.path(), LogConfig::default(), 0).unwrap();
        let contents = std::fs::read_to_string(dir.path().join(CURRENT_LOG_NAME)).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["_op"], "created");
        assert_eq!(writer.log_infos().len(), 1);
        assert!(writer.log_infos()[0].tx_ids.is_empty());
    }

    #[test]
    fn append_commit_extends_range_and_stays_valid_json() {
        let dir = tempdir().unwrap();
        let mut writer = LogWriter::create(dir.path(), LogConfig::default(), 0).unwrap();
        writer
            .append_commit(serde_json::json!({"_tx": 1, "_ts": "now", "objects/a": "x"}), 1)
            .unwrap();
        writer
            .append_commit(serde_json::json!({"_tx": 2, "_ts": "now", "objects/a": "y"}), 2)
            .unwrap();

        let contents = std::fs::read_to_string(dir.path().join(CURRENT_LOG_NAME)).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[2]["_tx"], 2);
        assert_eq!(writer.log_infos()[0].tx_ids.first, 1);
        assert_eq!(writer.log_infos()[0].tx_ids.last, 2);
    }

    #[test]
    fn rotation_archives_and_starts_fresh_segment() {
        let dir = tempdir().unwrap();
        let config = LogConfig { max_log_size: 40 };
        let mut writer = LogWriter::create(dir.path(), config, 0).unwrap();
        for i in 1..=5 {
            writer
                .append_commit(
                    serde_json::json!({"_tx": i, "_ts": "now", "objects/a": "xxxxxxxxxxxxxxxx"}),
                    i,
                )
                .unwrap();
        }
        assert!(writer.log_infos().len() > 1, "expected at least one rotation");
        assert!(dir.path().join(CURRENT_LOG_NAME).exists());
        let archived: Vec<_> = writer.log_infos()[..writer.log_infos().len() - 1].to_vec();
        for info in &archived {
            assert!(dir.path().join(&info.name).exists());
            assert_ne!(info.name, CURRENT_LOG_NAME);
        }
    }

    #[test]
    fn status_file_round_trips() {
        let dir = tempdir().unwrap();
        let writer = LogWriter::create(dir.path(), LogConfig::default(), 0).unwrap();
        let loaded = read_status_file(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, writer.log_infos().to_vec());
    }
}
