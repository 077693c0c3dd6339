//! Content-addressed artifact files.
//!
//! Generated text is written under a name derived from its SHA-256 digest,
//! so identical text always lands at the same path and a changed schedule
//! never overwrites a file another mapping row still points at.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::names::sanitize;
use crate::models::ChunkId;
use crate::{Error, Result};

/// Number of digest hex characters used in file names.
const NAME_DIGEST_LEN: usize = 12;

/// Hex SHA-256 of `text`.
pub fn digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// File name for a schedule's domain.
pub fn domain_file_name(schedule_id: &str, digest: &str) -> String {
    format!("{}_{}_domain.pddl", sanitize(schedule_id), short(digest))
}

/// File name for one chunk's problem.
pub fn problem_file_name(schedule_id: &str, chunk: ChunkId, digest: &str) -> String {
    format!(
        "{}_{}_{}_problem.pddl",
        sanitize(schedule_id),
        chunk,
        short(digest)
    )
}

fn short(digest: &str) -> &str {
    &digest[..digest.len().min(NAME_DIGEST_LEN)]
}

/// Write `text` to `dir/file_name` atomically.
///
/// The text goes to a temporary file in the same directory first and is
/// renamed into place, so a failed write never leaves a truncated artifact.
pub fn write_artifact(dir: &Path, file_name: &str, text: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(text.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(&path).map_err(|e| Error::Io(e.error))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_digest_is_stable_hex() {
        let a = digest("(define (domain construction))");
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, digest("(define (domain construction))"));
        assert_ne!(a, digest("(define (domain other))"));
    }

    #[test]
    fn test_file_names() {
        let d = digest("x");
        let domain = domain_file_name("site 4", &d);
        assert!(domain.starts_with("site_4_"));
        assert!(domain.ends_with("_domain.pddl"));
        assert_eq!(domain.len(), "site_4_".len() + 12 + "_domain.pddl".len());

        let problem = problem_file_name("site 4", ChunkId(2), &d);
        assert!(problem.starts_with("site_4_chunk_2_"));
        assert!(problem.ends_with("_problem.pddl"));
    }

    #[test]
    fn test_write_artifact_creates_dir_and_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("pddl");
        let path = write_artifact(&dir, "a.pddl", "hello").unwrap();
        assert_eq!(path, dir.join("a.pddl"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");

        // Overwrite in place
        write_artifact(&dir, "a.pddl", "again").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "again");
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 1);
    }
}
