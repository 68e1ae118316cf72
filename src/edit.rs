use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// Byte-span replacement with before-text verification.
///
/// Every change the weaver makes to a file, whether a rewritten function
/// body or an added import, is expressed as one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Splice does nothing until applied"]
pub struct Splice {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    pub new_text: String,
    pub expected_before: Verification,
}

/// What a splice expects to find before it is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    ExactMatch(String),
    /// xxh3 of the expected text
    Hash(u64),
}

impl Verification {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Verification::ExactMatch(expected) => text == expected,
            Verification::Hash(expected) => xxh3_64(text.as_bytes()) == *expected,
        }
    }

    /// Exact text up to 1 KiB, hash above.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            Verification::Hash(xxh3_64(text.as_bytes()))
        } else {
            Verification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("before-text verification failed at byte {byte_start}")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        found: String,
    },

    #[error("invalid byte range [{byte_start}, {byte_end}) in text of length {len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        len: usize,
    },

    #[error("splices overlap at byte {at}")]
    Overlap { at: usize },

    #[error("{0} changed on disk since it was read")]
    Conflict(PathBuf),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("splice would split a UTF-8 character")]
    InvalidUtf8Edit,
}

impl Splice {
    /// Replace `[byte_start, byte_end)`, expecting `expected_before` there.
    pub fn new(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: &str,
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: Verification::from_text(expected_before),
        }
    }

    /// Insert at `at` without replacing anything.
    pub fn insert(at: usize, new_text: impl Into<String>) -> Self {
        Self::new(at, at, new_text, "")
    }

    fn validate<'a>(&self, content: &'a str) -> Result<&'a str, EditError> {
        if self.byte_start > self.byte_end || self.byte_end > content.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                len: content.len(),
            });
        }
        let current = content
            .get(self.byte_start..self.byte_end)
            .ok_or(EditError::InvalidUtf8Edit)?;
        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                found: current.to_string(),
            });
        }
        Ok(current)
    }
}

/// Apply splices to `content` bottom-to-top.
///
/// All splices are validated against the original text before any is
/// applied. Zero-width splices at the same offset keep their given order.
pub fn apply_splices(content: &str, mut splices: Vec<Splice>) -> Result<String, EditError> {
    if splices.is_empty() {
        return Ok(content.to_string());
    }
    for splice in &splices {
        splice.validate(content)?;
    }

    // Stable sort, then reverse: descending starts, and equal-offset inserts
    // come out in reverse so each lands in front of the previous one.
    splices.sort_by_key(|s| s.byte_start);
    for pair in splices.windows(2) {
        if pair[0].byte_end > pair[1].byte_start {
            return Err(EditError::Overlap {
                at: pair[1].byte_start,
            });
        }
    }

    let mut out = content.to_string();
    for splice in splices.iter().rev() {
        out.replace_range(splice.byte_start..splice.byte_end, &splice.new_text);
    }
    Ok(out)
}

/// xxh3 of file content, used to detect concurrent modification.
pub fn content_hash(content: &str) -> u64 {
    xxh3_64(content.as_bytes())
}

/// Write `content` to `path` only if the file still hashes to `read_hash`.
pub fn write_if_unchanged(path: &Path, read_hash: u64, content: &str) -> Result<(), EditError> {
    let on_disk = fs::read(path)?;
    if xxh3_64(&on_disk) != read_hash {
        return Err(EditError::Conflict(path.to_path_buf()));
    }
    atomic_write(path, content.as_bytes())?;

    let now = filetime::FileTime::now();
    filetime::set_file_mtime(path, now)?;
    Ok(())
}

/// tempfile in the same directory, fsync, rename.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    if let Ok(meta) = fs::metadata(path) {
        // Keep the original file mode; tempfiles are created 0600.
        fs::set_permissions(temp.path(), meta.permissions())?;
    }

    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn verification_switches_to_hash_for_large_text() {
        assert!(matches!(
            Verification::from_text("small"),
            Verification::ExactMatch(_)
        ));
        let large = "x".repeat(2000);
        let verify = Verification::from_text(&large);
        assert!(matches!(verify, Verification::Hash(_)));
        assert!(verify.matches(&large));
        assert!(!verify.matches("x"));
    }

    #[test]
    fn applies_bottom_to_top() {
        let content = "func a() {}\nfunc b() {}\n";
        let splices = vec![
            Splice::new(10, 10, "\n\tx()\n", ""),
            Splice::new(22, 22, "\n\ty()\n", ""),
        ];
        let out = apply_splices(content, splices).unwrap();
        assert_eq!(out, "func a() {\n\tx()\n}\nfunc b() {\n\ty()\n}\n");
    }

    #[test]
    fn inserts_at_same_offset_keep_order() {
        let out = apply_splices("ab", vec![Splice::insert(1, "1"), Splice::insert(1, "2")]).unwrap();
        assert_eq!(out, "a12b");
    }

    #[test]
    fn rejects_mismatch_overlap_and_bad_range() {
        let content = "hello world";
        assert!(matches!(
            apply_splices(content, vec![Splice::new(0, 5, "bye", "howdy")]),
            Err(EditError::BeforeTextMismatch { .. })
        ));
        assert!(matches!(
            apply_splices(
                content,
                vec![Splice::new(0, 5, "a", "hello"), Splice::new(3, 7, "b", "lo w")]
            ),
            Err(EditError::Overlap { at: 3 })
        ));
        assert!(matches!(
            apply_splices(content, vec![Splice::new(5, 50, "", "")]),
            Err(EditError::InvalidByteRange { .. })
        ));
    }

    #[test]
    fn refuses_to_split_characters() {
        let result = apply_splices("héllo", vec![Splice::new(0, 2, "", "h\u{e9}")]);
        assert!(matches!(result, Err(EditError::InvalidUtf8Edit)));
    }

    #[test]
    fn write_checks_for_concurrent_modification() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.go");
        fs::write(&path, "package a\n").unwrap();
        let hash = content_hash("package a\n");

        write_if_unchanged(&path, hash, "package b\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "package b\n");

        let result = write_if_unchanged(&path, hash, "package c\n");
        assert!(matches!(result, Err(EditError::Conflict(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), "package b\n");
    }
}
