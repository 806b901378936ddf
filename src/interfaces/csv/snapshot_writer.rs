use crate::application::registry::ModuleSnapshot;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct SnapshotRow<'a> {
    channel_id: &'a str,
    name: &'a str,
    version: &'a str,
    channel_type: &'a str,
    path: String,
    loaded_at: String,
    last_used_at: String,
    usage_count: u64,
}

impl<'a> From<&'a ModuleSnapshot> for SnapshotRow<'a> {
    fn from(snapshot: &'a ModuleSnapshot) -> Self {
        Self {
            channel_id: &snapshot.channel_id,
            name: &snapshot.metadata.name,
            version: &snapshot.metadata.version,
            channel_type: &snapshot.metadata.channel_type,
            path: snapshot.path.display().to_string(),
            loaded_at: snapshot.loaded_at.to_rfc3339(),
            last_used_at: snapshot
                .last_used_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
            usage_count: snapshot.usage_count,
        }
    }
}

/// Writes registry snapshots as CSV, one row per channel.
///
/// Rows are ordered by channel id so output is stable across runs.
pub struct SnapshotWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> SnapshotWriter<W> {
    /// Creates a new `SnapshotWriter` over any `Write` sink (e.g. stdout).
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_snapshots<'a, I>(&mut self, snapshots: I) -> csv::Result<()>
    where
        I: IntoIterator<Item = &'a ModuleSnapshot>,
    {
        let mut rows: Vec<SnapshotRow<'_>> = snapshots.into_iter().map(SnapshotRow::from).collect();
        rows.sort_by(|a, b| a.channel_id.cmp(b.channel_id));
        for row in rows {
            self.writer.serialize(row)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metadata::ModuleMetadata;
    use chrono::Utc;
    use std::path::PathBuf;

    fn snapshot(channel_id: &str, usage_count: u64) -> ModuleSnapshot {
        ModuleSnapshot {
            channel_id: channel_id.to_string(),
            path: PathBuf::from("plugins/libmock.so"),
            metadata: ModuleMetadata {
                name: "Mock".to_string(),
                version: "1.0.0".to_string(),
                channel_type: "mock".to_string(),
                ..Default::default()
            },
            loaded_at: Utc::now(),
            last_used_at: None,
            usage_count,
        }
    }

    #[test]
    fn test_writer_sorts_and_emits_header() {
        let snapshots = [snapshot("zeta", 2), snapshot("alpha", 5)];
        let mut buf = Vec::new();
        SnapshotWriter::new(&mut buf)
            .write_snapshots(snapshots.iter())
            .unwrap();

        let out = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines[0],
            "channel_id,name,version,channel_type,path,loaded_at,last_used_at,usage_count"
        );
        assert!(lines[1].starts_with("alpha,Mock,1.0.0,mock,plugins/libmock.so,"));
        assert!(lines[1].ends_with(",,5"));
        assert!(lines[2].starts_with("zeta,"));
    }
}
