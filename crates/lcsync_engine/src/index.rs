//! Half-open interval lookup over dataset partitions.

use chrono::{DateTime, Utc};
use lcsync_protocol::parse_timestamp;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur building an interval index.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The partition directory could not be listed.
    #[error("cannot list partition directory {path}: {source}")]
    Directory {
        /// The directory that failed to list.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A partition file name does not parse as a timestamp.
    #[error("partition file name is not a timestamp: {0}")]
    BadPartitionName(PathBuf),

    /// Two partitions share a start boundary.
    #[error("duplicate partition boundary at {0}")]
    DuplicateBoundary(DateTime<Utc>),
}

/// One contiguous, boundary-delimited segment of the dataset.
///
/// A partition owns the half-open interval from its start boundary up to
/// the next partition's start; the last partition is open-ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Lower (inclusive) boundary of the interval this partition owns.
    pub start: DateTime<Utc>,
    /// Opaque handle to the backing page, typically a file path.
    pub source: PathBuf,
}

impl Partition {
    /// Creates a partition.
    pub fn new(start: DateTime<Utc>, source: impl Into<PathBuf>) -> Self {
        Self {
            start,
            source: source.into(),
        }
    }
}

/// Locates which ordered partition a timestamp falls into.
///
/// Boundaries are strictly increasing; partition `i` owns
/// `[start[i], start[i+1])` and the last partition owns
/// `[start[last], +inf)`. Lookup is a binary search over the boundaries,
/// so it stays cheap as retained history grows.
///
/// Built once at startup from a directory listing and read-only for the
/// process lifetime.
pub struct IntervalIndex {
    partitions: Vec<Partition>,
}

impl IntervalIndex {
    /// Creates an index from a set of partitions.
    ///
    /// Partitions are sorted by start boundary; duplicate boundaries are
    /// rejected.
    pub fn new(mut partitions: Vec<Partition>) -> Result<Self, IndexError> {
        partitions.sort_by_key(|p| p.start);
        for pair in partitions.windows(2) {
            if pair[0].start == pair[1].start {
                return Err(IndexError::DuplicateBoundary(pair[0].start));
            }
        }
        Ok(Self { partitions })
    }

    /// Creates an index with no partitions; every lookup misses.
    pub fn empty() -> Self {
        Self {
            partitions: Vec::new(),
        }
    }

    /// Builds an index from a directory of partition files.
    ///
    /// Each file's stem must parse as an ISO-8601 instant, which becomes
    /// the partition's start boundary (the dataset convention:
    /// `2024-01-01T00:00:00.000Z.jsonld`). Subdirectories are skipped.
    pub fn from_directory(dir: impl AsRef<Path>) -> Result<Self, IndexError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|source| IndexError::Directory {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut partitions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| IndexError::Directory {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| IndexError::BadPartitionName(path.clone()))?;
            let start = parse_timestamp(stem)
                .map_err(|_| IndexError::BadPartitionName(path.clone()))?;
            partitions.push(Partition::new(start, path));
        }

        Self::new(partitions)
    }

    /// Returns the partition whose interval contains `target`, or `None`
    /// if `target` precedes the first boundary (or the index is empty).
    ///
    /// Boundary equality resolves to the partition that starts at
    /// `target`: lower-inclusive, upper-exclusive.
    pub fn locate(&self, target: DateTime<Utc>) -> Option<&Partition> {
        self.locate_index(target).map(|i| &self.partitions[i])
    }

    /// Like [`locate`](Self::locate), but returns the partition's index.
    pub fn locate_index(&self, target: DateTime<Utc>) -> Option<usize> {
        let upper = self.partitions.partition_point(|p| p.start <= target);
        upper.checked_sub(1)
    }

    /// Returns all partitions, ascending by start boundary.
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Returns the number of partitions.
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    /// Returns true if the index holds no partitions.
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn index_of_days(days: &[u32]) -> IntervalIndex {
        let partitions = days
            .iter()
            .map(|d| Partition::new(day(*d), format!("connections/day-{d}.jsonld")))
            .collect();
        IntervalIndex::new(partitions).unwrap()
    }

    #[test]
    fn locate_midpoints_and_boundaries() {
        let index = index_of_days(&[1, 2]);

        // Midpoint falls into the earlier partition
        let noon = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(index.locate_index(noon), Some(0));

        // Boundary equality resolves to the partition that starts there
        assert_eq!(index.locate_index(day(2)), Some(1));
        assert_eq!(index.locate_index(day(1)), Some(0));
    }

    #[test]
    fn locate_at_every_boundary_edge() {
        let index = index_of_days(&[1, 2, 3, 4]);
        let epsilon = Duration::milliseconds(1);

        for (i, partition) in index.partitions().iter().enumerate() {
            assert_eq!(index.locate_index(partition.start), Some(i));
            if i > 0 {
                assert_eq!(index.locate_index(partition.start - epsilon), Some(i - 1));
            }
        }
    }

    #[test]
    fn before_first_boundary_is_not_found() {
        let index = index_of_days(&[2, 3]);
        assert!(index.locate(day(1)).is_none());
    }

    #[test]
    fn last_partition_is_open_ended() {
        let index = index_of_days(&[1, 2]);
        let far_future = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(index.locate_index(far_future), Some(1));
    }

    #[test]
    fn empty_index() {
        let index = IntervalIndex::new(Vec::new()).unwrap();
        assert!(index.is_empty());
        assert!(index.locate(day(1)).is_none());
    }

    #[test]
    fn unsorted_input_is_sorted() {
        let index = index_of_days(&[3, 1, 2]);
        let starts: Vec<_> = index.partitions().iter().map(|p| p.start).collect();
        assert_eq!(starts, [day(1), day(2), day(3)]);
    }

    #[test]
    fn duplicate_boundary_rejected() {
        let partitions = vec![
            Partition::new(day(1), "a.jsonld"),
            Partition::new(day(1), "b.jsonld"),
        ];
        assert!(matches!(
            IntervalIndex::new(partitions),
            Err(IndexError::DuplicateBoundary(_))
        ));
    }

    #[test]
    fn from_directory_listing() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "2024-01-02T00:00:00.000Z.jsonld",
            "2024-01-01T00:00:00.000Z.jsonld",
            "2024-01-03T00:00:00.000Z.jsonld",
        ] {
            std::fs::write(dir.path().join(name), "[]").unwrap();
        }
        std::fs::create_dir(dir.path().join("ignored-subdir")).unwrap();

        let index = IntervalIndex::from_directory(dir.path()).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.partitions()[0].start, day(1));

        let located = index
            .locate(Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap())
            .unwrap();
        assert!(located
            .source
            .to_string_lossy()
            .contains("2024-01-02T00:00:00.000Z"));
    }

    #[test]
    fn from_directory_rejects_bad_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();

        assert!(matches!(
            IntervalIndex::from_directory(dir.path()),
            Err(IndexError::BadPartitionName(_))
        ));
    }

    #[test]
    fn missing_directory_fails() {
        assert!(matches!(
            IntervalIndex::from_directory("/nonexistent/connections"),
            Err(IndexError::Directory { .. })
        ));
    }
}
