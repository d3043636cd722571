//! Segment planning: derive an ordered list of sub-ranges from a file's
//! measured extent and a split policy.
//!
//! The planner is pure — it never touches the file contents and performs no
//! I/O. The extent unit (seconds or bytes) is defined by the caller:
//! time-based policies operate on a measured duration, size-based chunking
//! on the raw byte length.

// ── Policy ─────────────────────────────────────────────────────────────────────

/// A caller-supplied explicit sub-range, in the same unit as the total extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub start: f64,
    pub end: f64,
}

/// Rule used to derive segments from a file.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitPolicy {
    /// Exactly `n` equal segments spanning the whole extent. Requires `n ≥ 2`.
    ByCount(u32),
    /// Consecutive segments of the given length; the last one is truncated
    /// to the remaining extent. Requires a positive length.
    ByDuration(f64),
    /// Explicit list of spans, trusted as given: no sorting, no overlap
    /// check, gaps permitted. List order defines output order.
    Manual(Vec<Span>),
}

// ── Error ──────────────────────────────────────────────────────────────────────

/// A split policy failed its structural invariants. Fatal to the plan call;
/// never retried.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanError {
    /// `ByCount(n)` with `n < 2` — splitting into fewer than two parts is
    /// not a split.
    CountTooSmall(u32),
    /// `ByDuration(d)` with `d ≤ 0`.
    NonPositiveDuration(f64),
    /// `Manual` with an empty span list.
    EmptyManualList,
    /// A manual span violates `0 ≤ start < end ≤ total`.
    SpanOutOfBounds {
        position: usize,
        start: f64,
        end: f64,
        total: f64,
    },
    /// Size-based chunking with a zero chunk size.
    ZeroChunkSize,
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CountTooSmall(n) => {
                write!(f, "segment count must be ≥ 2, got {n}")
            }
            Self::NonPositiveDuration(d) => {
                write!(f, "segment duration must be > 0, got {d}")
            }
            Self::EmptyManualList => {
                write!(f, "manual split requires at least one span")
            }
            Self::SpanOutOfBounds { position, start, end, total } => write!(
                f,
                "manual span #{position} [{start}, {end}) violates 0 ≤ start < end ≤ {total}",
            ),
            Self::ZeroChunkSize => {
                write!(f, "chunk size must be ≥ 1 byte")
            }
        }
    }
}

impl std::error::Error for PlanError {}

// ── Output ─────────────────────────────────────────────────────────────────────

/// One contiguous sub-range of the source extent. `index` is the 0-based
/// ordinal position that defines output order; segments are produced once
/// and never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

/// One contiguous byte range of the source file, for size-based chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub index: usize,
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

// ── Planning ───────────────────────────────────────────────────────────────────

/// Compute an ordered segment list for the given extent and policy.
///
/// A non-positive `total_extent` yields an empty plan for the count and
/// duration policies (there is nothing to cover); manual spans are validated
/// against it and will fail instead.
///
/// # Errors
/// Returns [`PlanError`] when the policy violates its structural invariants,
/// before anything downstream runs.
pub fn plan(total_extent: f64, policy: &SplitPolicy) -> Result<Vec<Segment>, PlanError> {
    match policy {
        SplitPolicy::ByCount(n) => {
            if *n < 2 {
                return Err(PlanError::CountTooSmall(*n));
            }
            if total_extent <= 0.0 {
                return Ok(Vec::new());
            }
            let n = *n as usize;
            let width = total_extent / n as f64;
            let segments = (0..n)
                .map(|i| Segment {
                    index: i,
                    start: i as f64 * width,
                    // Clamp the final end to the exact extent to absorb
                    // floating-point rounding in the width multiplication.
                    end: if i == n - 1 {
                        total_extent
                    } else {
                        ((i + 1) as f64 * width).min(total_extent)
                    },
                })
                .collect();
            Ok(segments)
        }

        SplitPolicy::ByDuration(d) => {
            if *d <= 0.0 {
                return Err(PlanError::NonPositiveDuration(*d));
            }
            let mut segments = Vec::new();
            let mut k = 0usize;
            loop {
                let start = k as f64 * d;
                if start >= total_extent {
                    break;
                }
                segments.push(Segment {
                    index: k,
                    start,
                    end: (start + d).min(total_extent),
                });
                k += 1;
            }
            Ok(segments)
        }

        SplitPolicy::Manual(spans) => {
            if spans.is_empty() {
                return Err(PlanError::EmptyManualList);
            }
            spans
                .iter()
                .enumerate()
                .map(|(position, span)| {
                    if span.start < 0.0 || span.start >= span.end || span.end > total_extent {
                        return Err(PlanError::SpanOutOfBounds {
                            position,
                            start: span.start,
                            end: span.end,
                            total: total_extent,
                        });
                    }
                    // Output order is the list order: the index is rewritten
                    // to the span's position regardless of its offsets.
                    Ok(Segment {
                        index: position,
                        start: span.start,
                        end: span.end,
                    })
                })
                .collect()
        }
    }
}

/// Compute fixed-size byte ranges covering `[0, total_bytes)`.
///
/// Used when a file exceeds the single-payload limit and no explicit
/// count/duration policy applies. Byte arithmetic is exact — no rounding,
/// no gap, no overlap.
pub fn plan_by_size(total_bytes: u64, chunk_size_bytes: u64) -> Result<Vec<ByteRange>, PlanError> {
    if chunk_size_bytes == 0 {
        return Err(PlanError::ZeroChunkSize);
    }
    let mut ranges = Vec::new();
    let mut start = 0u64;
    let mut index = 0usize;
    while start < total_bytes {
        let end = (start + chunk_size_bytes).min(total_bytes);
        ranges.push(ByteRange { index, start, end });
        start = end;
        index += 1;
    }
    Ok(ranges)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
