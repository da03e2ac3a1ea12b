use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::CheckpointError;
use crate::models::job::JobRecord;

/// Writes the full table to a fixed path, redirecting to a timestamped
/// sibling when the primary file cannot be replaced.
#[derive(Debug, Clone)]
pub struct CheckpointWriter {
    path: PathBuf,
}

impl CheckpointWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the primary path with `records`, or a backup path if that
    /// fails. Returns the path actually written.
    pub fn persist(&self, records: &[JobRecord]) -> Result<PathBuf, CheckpointError> {
        let primary_error = match write_atomic(&self.path, records) {
            Ok(()) => {
                tracing::info!(
                    "Saved {} rows -> {}",
                    records.len(),
                    self.path.display()
                );
                return Ok(self.path.clone());
            }
            Err(e) => e,
        };

        let backup = backup_path(&self.path, Utc::now().timestamp());
        tracing::warn!(
            "Could not write {} ({primary_error}); is it open in another program?",
            self.path.display()
        );

        match write_atomic(&backup, records) {
            Ok(()) => {
                tracing::warn!("Saved backup instead -> {}", backup.display());
                Ok(backup)
            }
            Err(backup_error) => Err(CheckpointError::Unwritable {
                primary: self.path.display().to_string(),
                primary_error: primary_error.to_string(),
                backup: backup.display().to_string(),
                backup_error: backup_error.to_string(),
            }),
        }
    }

    /// Read a previously written table, coercing it to the current schema.
    pub fn load(&self) -> Result<Vec<JobRecord>, CheckpointError> {
        load_table(&self.path)
    }
}

/// `<stem>_backup_<unix-seconds><.ext>` next to `path`.
pub fn backup_path(path: &Path, unix_seconds: i64) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "checkpoint".to_string());
    let name = match path.extension() {
        Some(ext) => format!("{stem}_backup_{unix_seconds}.{}", ext.to_string_lossy()),
        None => format!("{stem}_backup_{unix_seconds}"),
    };
    path.with_file_name(name)
}

/// Write to a sibling temp file, then rename over `path`.
///
/// An existing `path` must itself accept writes. Rename only needs
/// directory permissions and would otherwise replace a read-only or
/// locked file.
fn write_atomic(path: &Path, records: &[JobRecord]) -> Result<(), CheckpointError> {
    if path.exists() {
        OpenOptions::new().write(true).open(path)?;
    }

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let result = write_table(&tmp, records).and_then(|()| Ok(fs::rename(&tmp, path)?));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_table(path: &Path, records: &[JobRecord]) -> Result<(), CheckpointError> {
    let file = File::create(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    // Explicit header so an empty table still carries the schema
    writer.write_record(JobRecord::FIELDS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Missing columns load as null, unknown columns are dropped, and
/// unparsable salary cells become null.
pub fn load_table(path: &Path) -> Result<Vec<JobRecord>, CheckpointError> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);

    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn sample(id: &str) -> JobRecord {
        JobRecord {
            job_id: Some(id.to_string()),
            title: Some("Data Analyst".to_string()),
            company: Some("Acme, Inc.".to_string()),
            salary_min: Some(50_000.0),
            salary_max: Some(70_000.0),
            description: Some("Line one\nline two".to_string()),
            role_query: Some("Data Analyst".to_string()),
            country_query: Some("in".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_persist_then_load() {
        let dir = TempDir::new().unwrap();
        let writer = CheckpointWriter::new(dir.path().join("jobs.csv"));
        let records = vec![sample("a"), sample("b")];

        let written = writer.persist(&records).unwrap();
        assert_eq!(written, writer.path());
        assert!(!dir.path().join("jobs.csv.tmp").exists());

        let loaded = writer.load().unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn test_persist_overwrites() {
        let dir = TempDir::new().unwrap();
        let writer = CheckpointWriter::new(dir.path().join("jobs.csv"));

        writer.persist(&[sample("a"), sample("b")]).unwrap();
        writer.persist(&[sample("c")]).unwrap();

        let loaded = writer.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].job_id.as_deref(), Some("c"));
    }

    #[test]
    fn test_empty_table_keeps_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("jobs.csv");
        CheckpointWriter::new(&path).persist(&[]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), JobRecord::FIELDS.join(","));
        assert!(load_table(&path).unwrap().is_empty());
    }

    #[test]
    fn test_unwritable_primary_falls_back_to_backup() {
        let dir = TempDir::new().unwrap();
        // A directory squatting on the primary path cannot be replaced by a file.
        let primary = dir.path().join("jobs.csv");
        fs::create_dir(&primary).unwrap();
        fs::write(primary.join("keep"), "x").unwrap();

        let writer = CheckpointWriter::new(&primary);
        let written = writer.persist(&[sample("a")]).unwrap();

        assert_ne!(written, primary);
        let name = written.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("jobs_backup_"), "{name}");
        assert!(name.ends_with(".csv"), "{name}");
        assert_eq!(load_table(&written).unwrap(), vec![sample("a")]);
        // Primary left untouched
        assert!(primary.join("keep").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_primary_falls_back_to_backup() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("jobs.csv");
        fs::write(&primary, "ORIGINAL").unwrap();
        fs::set_permissions(&primary, fs::Permissions::from_mode(0o444)).unwrap();

        // Permission bits do not bind root
        if OpenOptions::new().write(true).open(&primary).is_ok() {
            return;
        }

        let writer = CheckpointWriter::new(&primary);
        let written = writer.persist(&[sample("a")]).unwrap();

        assert_ne!(written, primary);
        let name = written.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("jobs_backup_"), "{name}");
        assert_eq!(load_table(&written).unwrap(), vec![sample("a")]);
        assert_eq!(fs::read_to_string(&primary).unwrap(), "ORIGINAL");
        assert!(!dir.path().join("jobs.csv.tmp").exists());
    }

    #[test]
    fn test_backup_path() {
        let p = backup_path(Path::new("data/raw/jobs.csv"), 1_700_000_000);
        assert_eq!(p, PathBuf::from("data/raw/jobs_backup_1700000000.csv"));

        let p = backup_path(Path::new("jobs"), 5);
        assert_eq!(p, PathBuf::from("jobs_backup_5"));
    }

    #[test]
    fn test_load_coerces_foreign_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.csv");
        fs::write(
            &path,
            "url,extra,title,salary_min,job_id\n\
             https://jobs.example/1,zzz,Analyst,not-a-number,\n\
             ,yyy,Engineer,1200.5,J2\n",
        )
        .unwrap();

        let loaded = load_table(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].url.as_deref(), Some("https://jobs.example/1"));
        assert_eq!(loaded[0].title.as_deref(), Some("Analyst"));
        assert_eq!(loaded[0].salary_min, None);
        assert_eq!(loaded[0].job_id, None);
        assert_eq!(loaded[0].company, None);
        assert_eq!(loaded[1].job_id.as_deref(), Some("J2"));
        assert_eq!(loaded[1].salary_min, Some(1200.5));
        assert_eq!(loaded[1].url, None);
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_table(&dir.path().join("absent.csv")).is_err());
    }
}
