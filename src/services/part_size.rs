//! Chunking policy for multipart uploads.
//!
//! The plan depends on the file size alone, so re-initiating an upload of the
//! same size always yields the same chunking.

use thiserror::Error;

pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;
pub const MAX_TOTAL_PARTS: u64 = 10_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PartSizeError {
    #[error("unable to compute part size for empty files")]
    EmptyFile,
    #[error("file size {size} exceeds maximum allowed size of {max} bytes")]
    TooLarge { size: u64, max: u64 },
    #[error("file size {0} exceeds maximum uploadable size")]
    ExceedsMaxPartSize(u64),
}

/// How a file of a given size is split into parts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartPlan {
    pub part_size: u64,
    pub total_parts: u64,
}

/// Compute the part size and part count for a file of `file_size` bytes.
///
/// Every part except possibly the last is exactly `part_size` bytes, the
/// count never exceeds [`MAX_TOTAL_PARTS`] and no part exceeds
/// [`MAX_PART_SIZE`].
pub fn compute_part_size(file_size: u64) -> Result<PartPlan, PartSizeError> {
    if file_size == 0 {
        return Err(PartSizeError::EmptyFile);
    }

    let max = MAX_PART_SIZE * MAX_TOTAL_PARTS;
    if file_size > max {
        return Err(PartSizeError::TooLarge {
            size: file_size,
            max,
        });
    }

    if file_size <= MIN_PART_SIZE {
        return Ok(PartPlan {
            part_size: file_size,
            total_parts: 1,
        });
    }

    let mut part_size = MIN_PART_SIZE;
    if file_size.div_ceil(part_size) > MAX_TOTAL_PARTS {
        part_size = file_size.div_ceil(MAX_TOTAL_PARTS).max(MIN_PART_SIZE);
        if part_size > MAX_PART_SIZE {
            return Err(PartSizeError::ExceedsMaxPartSize(file_size));
        }
    }

    Ok(PartPlan {
        part_size,
        total_parts: file_size.div_ceil(part_size),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    fn assert_bounds(file_size: u64, plan: PartPlan) {
        assert!(plan.total_parts >= 1);
        assert!(plan.total_parts <= MAX_TOTAL_PARTS, "too many parts for {file_size}");
        assert!(plan.part_size <= MAX_PART_SIZE);
        // every part but the last is full, the last holds the remainder
        let full = plan.part_size * (plan.total_parts - 1);
        assert!(full < file_size);
        assert!(file_size - full <= plan.part_size);
    }

    #[test]
    fn empty_file_is_rejected() {
        assert_eq!(compute_part_size(0), Err(PartSizeError::EmptyFile));
    }

    #[test]
    fn small_file_is_a_single_part() {
        let plan = compute_part_size(42).unwrap();
        assert_eq!(plan, PartPlan { part_size: 42, total_parts: 1 });

        let plan = compute_part_size(MIN_PART_SIZE).unwrap();
        assert_eq!(plan.part_size, MIN_PART_SIZE);
        assert_eq!(plan.total_parts, 1);
    }

    #[test]
    fn twelve_mib_splits_into_three_min_parts() {
        let plan = compute_part_size(12 * MIB).unwrap();
        assert_eq!(plan.part_size, 5 * MIB);
        assert_eq!(plan.total_parts, 3);
    }

    #[test]
    fn just_above_min_needs_two_parts() {
        let plan = compute_part_size(MIN_PART_SIZE + 1).unwrap();
        assert_eq!(plan.part_size, MIN_PART_SIZE);
        assert_eq!(plan.total_parts, 2);
    }

    #[test]
    fn part_size_grows_once_count_would_overflow() {
        let at_limit = MIN_PART_SIZE * MAX_TOTAL_PARTS;
        let plan = compute_part_size(at_limit).unwrap();
        assert_eq!(plan.part_size, MIN_PART_SIZE);
        assert_eq!(plan.total_parts, MAX_TOTAL_PARTS);

        let plan = compute_part_size(at_limit + 1).unwrap();
        assert!(plan.part_size > MIN_PART_SIZE);
        assert_eq!(plan.total_parts, MAX_TOTAL_PARTS);
    }

    #[test]
    fn absolute_ceiling() {
        let max = MAX_PART_SIZE * MAX_TOTAL_PARTS;
        let plan = compute_part_size(max).unwrap();
        assert_eq!(plan.part_size, MAX_PART_SIZE);
        assert_eq!(plan.total_parts, MAX_TOTAL_PARTS);

        assert_eq!(
            compute_part_size(max + 1),
            Err(PartSizeError::TooLarge { size: max + 1, max })
        );
    }

    #[test]
    fn plans_are_deterministic_and_bounded() {
        let sizes = [
            1,
            MIB,
            MIN_PART_SIZE - 1,
            MIN_PART_SIZE + 1,
            7 * MIB + 3,
            1024 * MIB,
            MIN_PART_SIZE * MAX_TOTAL_PARTS + 12_345,
            3 * 1024 * 1024 * MIB,
            MAX_PART_SIZE * MAX_TOTAL_PARTS - 1,
        ];
        for size in sizes {
            let first = compute_part_size(size).unwrap();
            let second = compute_part_size(size).unwrap();
            assert_eq!(first, second);
            assert_bounds(size, first);
        }
    }
}
