use splitdl_core::{ByteRange, SplitError};

/// Bytes per planned range: `ceil(total_size / chunk_count)`.
pub fn chunk_size(total_size: u64, chunk_count: usize) -> u64 {
    total_size.div_ceil(chunk_count as u64)
}

/// Divides `[0, total_size - 1]` into at most `chunk_count` contiguous ranges.
///
/// Every range but the last holds exactly [`chunk_size`] bytes. When the
/// count does not divide the size, trailing slots that would start at or past
/// `total_size` are dropped, so fewer than `chunk_count` ranges may come back.
pub fn plan(total_size: u64, chunk_count: usize) -> Result<Vec<ByteRange>, SplitError> {
    if total_size == 0 {
        return Err(SplitError::InvalidArgument(
            "cannot plan ranges for an empty resource".to_string(),
        ));
    }
    if chunk_count == 0 {
        return Err(SplitError::InvalidArgument(
            "chunk count must be at least 1".to_string(),
        ));
    }

    let size = chunk_size(total_size, chunk_count);
    let mut ranges = Vec::new();

    // The size comes from the server, so offsets near u64::MAX must not wrap.
    for i in 0..chunk_count as u64 {
        let start = match i.checked_mul(size) {
            Some(start) if start < total_size => start,
            _ => break,
        };
        let end = start.saturating_add(size - 1).min(total_size - 1);
        ranges.push(ByteRange::new(start, end));
    }

    tracing::debug!(
        total_size,
        chunk_count,
        chunk_size = size,
        planned = ranges.len(),
        "planned byte ranges"
    );

    Ok(ranges)
}
