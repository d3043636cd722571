//! Split a media file into standalone downloadable parts.
//!
//! The sibling pipeline to transcription: the same planner, but each
//! planned segment becomes an output artifact instead of a remote call.
//! Extracted bytes are a direct slice of the original container — nothing
//! is re-encoded, so a part boundary rarely lands on a keyframe or sample
//! boundary. That approximation is accepted, not worked around.

use crate::media::{self, MediaFile};
use crate::planner::{self, PlanError, Segment, SplitPolicy};

// ── Types ──────────────────────────────────────────────────────────────────────

/// Extension handling for exported parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    /// Keep the source file's extension.
    Same,
    /// Use the given extension (with or without a leading dot).
    Extension(String),
}

/// One exported part, ready for download or writing to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedSegment {
    pub bytes: Vec<u8>,
    /// Source stem + 1-based part number + extension.
    pub filename: String,
    /// `mm:ss` of the part's time span; `--:--` when the source duration is
    /// unknown and planning fell back to byte extents.
    pub duration_label: String,
    /// Part size scaled to B/KB/MB/GB with two-decimal rounding.
    pub size_label: String,
}

/// Failure of an export call. Raised before any part is materialized.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportError {
    Plan(PlanError),
    /// The policy produced zero parts (e.g. a zero-length source).
    EmptySelection,
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plan(e) => write!(f, "invalid split plan: {e}"),
            Self::EmptySelection => write!(f, "split produced no parts"),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<PlanError> for ExportError {
    fn from(e: PlanError) -> Self {
        Self::Plan(e)
    }
}

// ── Export ─────────────────────────────────────────────────────────────────────

/// Split `file` into parts per `policy` and derive a name and labels for
/// each.
///
/// When the file carries a measured duration, the policy operates on time
/// extents and each time segment is scaled proportionally to a byte range.
/// Otherwise the policy operates on the byte length directly and segment
/// offsets are byte offsets as-is.
pub fn split(
    file: &MediaFile,
    policy: &SplitPolicy,
    format: &OutputFormat,
) -> Result<Vec<ExportedSegment>, ExportError> {
    let total_bytes = file.size_bytes();

    let (segments, time_based) = match file.duration_secs() {
        Some(duration) if duration > 0.0 => (planner::plan(duration, policy)?, true),
        _ => (planner::plan(total_bytes as f64, policy)?, false),
    };
    if segments.is_empty() {
        return Err(ExportError::EmptySelection);
    }

    let extension = match format {
        OutputFormat::Same => None,
        OutputFormat::Extension(ext) => Some(ext.as_str()),
    };

    let bytes_per_unit = if time_based {
        // Scale seconds to bytes proportionally. The file duration is > 0
        // in this branch.
        total_bytes as f64 / file.duration_secs().unwrap_or(1.0)
    } else {
        1.0
    };

    tracing::debug!(
        file = %file.name(),
        parts = segments.len(),
        time_based,
        "🔪 splitting for export"
    );

    let parts = segments
        .iter()
        .map(|segment| export_one(file, segment, bytes_per_unit, time_based, extension))
        .collect();
    Ok(parts)
}

fn export_one(
    file: &MediaFile,
    segment: &Segment,
    bytes_per_unit: f64,
    time_based: bool,
    extension: Option<&str>,
) -> ExportedSegment {
    let total_bytes = file.size_bytes();
    let start = ((segment.start * bytes_per_unit).round() as u64).min(total_bytes);
    let end = ((segment.end * bytes_per_unit).round() as u64).min(total_bytes);
    let bytes = file.slice(start, end).to_vec();

    let duration_label = if time_based {
        format_duration_label(segment.end - segment.start)
    } else {
        "--:--".to_string()
    };

    ExportedSegment {
        size_label: format_size_label(bytes.len() as u64),
        filename: media::part_file_name(file.name(), segment.index + 1, extension),
        duration_label,
        bytes,
    }
}

// ── Labels ─────────────────────────────────────────────────────────────────────

/// `mm:ss`, seconds rounded to the nearest whole. Minutes are not wrapped
/// into hours.
pub fn format_duration_label(secs: f64) -> String {
    let whole = secs.max(0.0).round() as u64;
    format!("{:02}:{:02}", whole / 60, whole % 60)
}

/// Human-readable size: bytes below 1 KB as-is, otherwise scaled to the
/// largest fitting unit with two decimals.
pub fn format_size_label(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GB", b / GB)
    } else if b >= MB {
        format!("{:.2} MB", b / MB)
    } else if b >= KB {
        format!("{:.2} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::Span;

    fn timed_file(duration: f64, size: usize) -> MediaFile {
        MediaFile::new("talk.mp3", "audio/mpeg", (0..size).map(|i| i as u8).collect())
            .with_duration(duration)
    }

    #[test]
    fn by_count_scales_time_to_bytes() {
        // 30 s / 300 bytes → 10 bytes per second, three parts of 100 bytes.
        let file = timed_file(30.0, 300);
        let parts = split(&file, &SplitPolicy::ByCount(3), &OutputFormat::Same).unwrap();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].bytes.len(), 100);
        assert_eq!(parts[1].bytes.len(), 100);
        assert_eq!(parts[2].bytes.len(), 100);
        assert_eq!(parts[0].bytes[0], 0);
        assert_eq!(parts[1].bytes[0], 100);
        assert_eq!(parts[2].bytes[0], 200);
        assert_eq!(parts[0].duration_label, "00:10");
        assert_eq!(parts[0].size_label, "100 B");
    }

    #[test]
    fn filenames_are_one_based_with_source_extension() {
        let file = timed_file(30.0, 300);
        let parts = split(&file, &SplitPolicy::ByCount(3), &OutputFormat::Same).unwrap();
        assert_eq!(parts[0].filename, "talk_part1.mp3");
        assert_eq!(parts[2].filename, "talk_part3.mp3");
    }

    #[test]
    fn requested_extension_overrides_source() {
        let file = timed_file(30.0, 300);
        let parts = split(
            &file,
            &SplitPolicy::ByCount(2),
            &OutputFormat::Extension("wav".into()),
        )
        .unwrap();
        assert_eq!(parts[0].filename, "talk_part1.wav");
        assert_eq!(parts[1].filename, "talk_part2.wav");
    }

    #[test]
    fn manual_gaps_are_preserved() {
        // Scenario: [0,10) and [20,30) on a 30-second file — two parts, the
        // middle ten seconds in neither.
        let file = timed_file(30.0, 300);
        let policy = SplitPolicy::Manual(vec![
            Span { start: 0.0, end: 10.0 },
            Span { start: 20.0, end: 30.0 },
        ]);
        let parts = split(&file, &policy, &OutputFormat::Same).unwrap();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].bytes.len(), 100);
        assert_eq!(parts[1].bytes.len(), 100);
        assert_eq!(parts[1].bytes[0], 200);
        assert_eq!(parts[1].duration_label, "00:10");
    }

    #[test]
    fn unknown_duration_falls_back_to_byte_extents() {
        let file = MediaFile::new("talk.mp3", "audio/mpeg", vec![7u8; 100]);
        let parts = split(&file, &SplitPolicy::ByDuration(40.0), &OutputFormat::Same).unwrap();

        // 100 bytes in "40-unit" parts: 40, 40, 20.
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].bytes.len(), 40);
        assert_eq!(parts[2].bytes.len(), 20);
        assert_eq!(parts[0].duration_label, "--:--");
    }

    #[test]
    fn invalid_policy_propagates() {
        let file = timed_file(30.0, 300);
        assert_eq!(
            split(&file, &SplitPolicy::ByCount(1), &OutputFormat::Same),
            Err(ExportError::Plan(PlanError::CountTooSmall(1)))
        );
    }

    #[test]
    fn zero_length_source_is_empty_selection() {
        let file = MediaFile::new("talk.mp3", "audio/mpeg", Vec::new());
        assert_eq!(
            split(&file, &SplitPolicy::ByCount(3), &OutputFormat::Same),
            Err(ExportError::EmptySelection)
        );
    }

    #[test]
    fn duration_labels() {
        assert_eq!(format_duration_label(0.0), "00:00");
        assert_eq!(format_duration_label(5.4), "00:05");
        assert_eq!(format_duration_label(90.0), "01:30");
        assert_eq!(format_duration_label(3601.0), "60:01");
    }

    #[test]
    fn size_labels() {
        assert_eq!(format_size_label(500), "500 B");
        assert_eq!(format_size_label(1024), "1.00 KB");
        assert_eq!(format_size_label(1536), "1.50 KB");
        assert_eq!(format_size_label(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_size_label(3 * 1024 * 1024 * 1024), "3.00 GB");
    }
}
