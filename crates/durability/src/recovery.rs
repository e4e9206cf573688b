//! Log recovery: reconcile the status file with what is actually on disk,
//! or rebuild the index from scratch by scanning the system directory.
//!
//! Recovery is considered authoritative: whatever commit id it settles on
//! becomes both `lastCommitted` and `lastPrepared` going forward (spec §4.10).

use crate::log_info::{LogFileInfo, TxRange};
use crate::log_writer::{read_status_file, LogConfig, LogWriter, CURRENT_LOG_NAME};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use txm_core::{Error, Result, TxId};

/// Run recovery against `dir` and hand back an open, consistent log plus
/// the commit id every future prepare/commit should build on.
pub fn recover(dir: &Path, config: LogConfig) -> Result<(LogWriter, TxId, TxId)> {
    let rebuilt = match read_status_file(dir)? {
        Some(infos) => match validate_and_rebuild(dir, infos) {
            Ok(rebuilt) => rebuilt,
            Err(e) => {
                warn!(error = %e, "status file failed validation, rescanning directory");
                scan_dir(dir)?
            }
        },
        None => {
            info!("no status file present, rescanning directory");
            scan_dir(dir)?
        }
    };

    let mut writer = LogWriter::open(dir, config, rebuilt)?;
    writer.append_meta("recovered", serde_json::Map::new())?;

    let current = writer.log_infos().last().expect("segment index is never empty");
    let last_committed = if current.tx_ids.is_empty() {
        current.tx_ids.first - 1
    } else {
        current.tx_ids.last
    };
    let last_prepared = last_committed;

    info!(last_committed, "recovery complete");
    Ok((writer, last_committed, last_prepared))
}

/// Re-validate every segment the status file named: each must still exist
/// unless its recorded range was empty, each is reloaded and its range
/// recomputed from its own content (not trusted from the status file), and
/// successive ranges must be contiguous.
fn validate_and_rebuild(dir: &Path, infos: Vec<LogFileInfo>) -> Result<Vec<LogFileInfo>> {
    let mut rebuilt = Vec::with_capacity(infos.len());
    for info in infos {
        let path = dir.join(&info.name);
        if !path.exists() {
            if info.tx_ids.is_empty() {
                continue; // an empty historical segment may simply be forgotten
            }
            return Err(Error::Recovery(format!(
                "segment {} is missing but its recorded range {:?} is non-empty",
                info.name, info.tx_ids
            )));
        }
        let (tx_ids, size, timestamp) = scan_segment(&path)?;
        rebuilt.push(LogFileInfo { name: info.name, tx_ids, size, timestamp });
    }

    if rebuilt.is_empty() {
        return Err(Error::Recovery("no segments survived validation".into()));
    }

    for pair in rebuilt.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if !a.tx_ids.is_empty() && !b.tx_ids.is_empty() && b.tx_ids.first != a.tx_ids.last + 1 {
            return Err(Error::Recovery(format!(
                "non-contiguous commit ranges between {} ({:?}) and {} ({:?})",
                a.name, a.tx_ids, b.name, b.tx_ids
            )));
        }
    }

    Ok(rebuilt)
}

/// Fall back to listing `txlog.json`/`txlog_<ts>.json` directly and
/// rebuilding the index from their contents. Archive names sort lexically
/// in chronological order by construction; the current segment always
/// sorts last.
fn scan_dir(dir: &Path) -> Result<Vec<LogFileInfo>> {
    let mut archived: Vec<String> = Vec::new();
    let mut has_current = false;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == CURRENT_LOG_NAME {
            has_current = true;
        } else if name.starts_with("txlog_") && name.ends_with(".json") {
            archived.push(name);
        }
    }
    archived.sort();

    let mut rebuilt = Vec::with_capacity(archived.len() + 1);
    for name in archived {
        let (tx_ids, size, timestamp) = scan_segment(&dir.join(&name))?;
        rebuilt.push(LogFileInfo { name, tx_ids, size, timestamp });
    }

    if !has_current {
        return Err(Error::Recovery(format!(
            "no {CURRENT_LOG_NAME} found while scanning {}",
            dir.display()
        )));
    }
    let (tx_ids, size, timestamp) = scan_segment(&dir.join(CURRENT_LOG_NAME))?;
    rebuilt.push(LogFileInfo { name: CURRENT_LOG_NAME.to_string(), tx_ids, size, timestamp });

    Ok(rebuilt)
}

/// Load a segment and recompute its commit-id range directly from its
/// `created`/`_tx` entries, ignoring whatever the status file claimed.
fn scan_segment(path: &Path) -> Result<(TxRange, u64, String)> {
    let contents = fs::read_to_string(path)?;
    let size = contents.len() as u64;
    let values: Vec<Value> = serde_json::from_str(&contents)
        .map_err(|e| Error::Recovery(format!("{} did not parse: {e}", path.display())))?;

    let mut prev_tx: TxId = 0;
    let mut max_tx: Option<TxId> = None;
    let mut timestamp = String::new();

    for value in &values {
        if let Some(op) = value.get("_op").and_then(Value::as_str) {
            if op == "created" {
                prev_tx = value.get("_prev_tx").and_then(Value::as_i64).unwrap_or(0);
                timestamp = value
                    .get("_ts")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
            }
        } else if let Some(tx) = value.get("_tx").and_then(Value::as_i64) {
            max_tx = Some(max_tx.map_or(tx, |m| m.max(tx)));
        }
    }

    let tx_ids = match max_tx {
        Some(last) => TxRange { first: prev_tx + 1, last },
        None => TxRange::empty_starting_at(prev_tx + 1),
    };
    Ok((tx_ids, size, timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_writer::write_status_file;
    use tempfile::tempdir;

    #[test]
    fn recovers_after_status_file_deleted() {
        let dir = tempdir().unwrap();
        {
            let mut writer = LogWriter::create(dir.path(), LogConfig::default(), 0).unwrap();
            for i in 1..=3 {
                writer
                    .append_commit(serde_json::json!({"_tx": i, "_ts": "now"}), i)
                    .unwrap();
            }
        }
        fs::remove_file(dir.path().join("txmgr.json")).unwrap();

        let (writer, last_committed, last_prepared) =
            recover(dir.path(), LogConfig::default()).unwrap();
        assert_eq!(last_committed, 3);
        assert_eq!(last_prepared, 3);
        assert_eq!(writer.log_infos().last().unwrap().tx_ids.last, 3);

        let contents = fs::read_to_string(dir.path().join(CURRENT_LOG_NAME)).unwrap();
        let values: Vec<Value> = serde_json::from_str(&contents).unwrap();
        assert_eq!(values.last().unwrap()["_op"], "recovered");
    }

    #[test]
    fn recovers_with_stale_status_file() {
        let dir = tempdir().unwrap();
        {
            let mut writer = LogWriter::create(dir.path(), LogConfig::default(), 0).unwrap();
            writer
                .append_commit(serde_json::json!({"_tx": 1, "_ts": "now"}), 1)
                .unwrap();
        }
        // Corrupt the status file so it no longer matches reality.
        write_status_file(
            dir.path(),
            &[LogFileInfo {
                name: CURRENT_LOG_NAME.to_string(),
                tx_ids: TxRange { first: 1, last: 99 },
                size: 0,
                timestamp: "bogus".to_string(),
            }],
        )
        .unwrap();

        let (_writer, last_committed, _) = recover(dir.path(), LogConfig::default()).unwrap();
        assert_eq!(last_committed, 1, "recovery should recompute from file content, not trust the stale status file");
    }

    #[test]
    fn non_contiguous_ranges_fall_back_to_scan() {
        let dir = tempdir().unwrap();
        {
            let mut writer = LogWriter::create(dir.path(), LogConfig::default(), 0).unwrap();
            writer
                .append_commit(serde_json::json!({"_tx": 1, "_ts": "now"}), 1)
                .unwrap();
        }
        write_status_file(
            dir.path(),
            &[
                LogFileInfo {
                    name: "txlog_bogus.json".to_string(),
                    tx_ids: TxRange { first: 1, last: 5 },
                    size: 10,
                    timestamp: "bogus".to_string(),
                },
                LogFileInfo {
                    name: CURRENT_LOG_NAME.to_string(),
                    tx_ids: TxRange { first: 1, last: 1 },
                    size: 0,
                    timestamp: "bogus".to_string(),
                },
            ],
        )
        .unwrap();

        // The bogus archive is missing from disk with a non-empty range,
        // so validation must abort and recovery must fall back to scanning.
        let (_writer, last_committed, _) = recover(dir.path(), LogConfig::default()).unwrap();
        assert_eq!(last_committed, 1);
    }
}
