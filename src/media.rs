//! In-memory media file handle.
//!
//! The pipeline never decodes audio or video: it operates on byte-range
//! slices of the original container. A [`MediaFile`] is therefore just a
//! named, typed byte buffer, optionally annotated with a measured duration
//! when the surrounding application knows it (enables time-based split
//! policies; absent, planning falls back to byte extents).

/// An opaque media blob selected for one pipeline invocation. Immutable for
/// the duration of the run; the orchestrator and exporter only read slices.
#[derive(Debug, Clone)]
pub struct MediaFile {
    name: String,
    media_type: String,
    bytes: Vec<u8>,
    duration_secs: Option<f64>,
}

impl MediaFile {
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
            duration_secs: None,
        }
    }

    /// Attach a measured total duration in seconds, when the caller has one.
    pub fn with_duration(mut self, duration_secs: f64) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.duration_secs
    }

    /// Borrow the byte range `[start, end)`, clamped to the file extent.
    /// An inverted range yields an empty slice.
    pub fn slice(&self, start: u64, end: u64) -> &[u8] {
        let len = self.bytes.len();
        let start = (start as usize).min(len);
        let end = (end as usize).min(len);
        if start >= end {
            &[]
        } else {
            &self.bytes[start..end]
        }
    }

    /// File name without its final extension.
    pub fn base_name(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }

    /// Final extension of the file name, without the dot.
    pub fn extension(&self) -> Option<&str> {
        match self.name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
            _ => None,
        }
    }
}

// ── Naming and type helpers ────────────────────────────────────────────────────

/// MIME type for a file extension, covering the containers the remote
/// transcription endpoint accepts. Unknown extensions fall back to a
/// generic binary type rather than failing — the endpoint does its own
/// container sniffing.
pub fn media_type_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "mp3" | "mpga" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        "mp4" => "video/mp4",
        "mpeg" => "video/mpeg",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

/// Derive a per-part file name: source stem + 1-based part number + extension.
///
/// `extension_override = None` keeps the source extension. A source name
/// without an extension produces a bare `stem_partN`.
pub fn part_file_name(source_name: &str, part: usize, extension_override: Option<&str>) -> String {
    let (stem, source_ext) = match source_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (source_name, None),
    };
    let ext = extension_override
        .map(|e| e.trim_start_matches('.'))
        .or(source_ext);
    match ext {
        Some(ext) => format!("{stem}_part{part}.{ext}"),
        None => format!("{stem}_part{part}"),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_is_clamped_to_extent() {
        let file = MediaFile::new("a.mp3", "audio/mpeg", vec![1, 2, 3, 4]);
        assert_eq!(file.slice(1, 3), &[2, 3]);
        assert_eq!(file.slice(2, 100), &[3, 4]);
        assert_eq!(file.slice(100, 200), &[] as &[u8]);
        assert_eq!(file.slice(3, 1), &[] as &[u8]);
    }

    #[test]
    fn base_name_and_extension() {
        let file = MediaFile::new("meeting.final.mp3", "audio/mpeg", Vec::new());
        assert_eq!(file.base_name(), "meeting.final");
        assert_eq!(file.extension(), Some("mp3"));

        let bare = MediaFile::new("recording", "application/octet-stream", Vec::new());
        assert_eq!(bare.base_name(), "recording");
        assert_eq!(bare.extension(), None);

        let hidden = MediaFile::new(".bashrc", "application/octet-stream", Vec::new());
        assert_eq!(hidden.base_name(), ".bashrc");
        assert_eq!(hidden.extension(), None);
    }

    #[test]
    fn media_type_lookup() {
        assert_eq!(media_type_for_extension("MP3"), "audio/mpeg");
        assert_eq!(media_type_for_extension("webm"), "video/webm");
        assert_eq!(media_type_for_extension("xyz"), "application/octet-stream");
    }

    #[test]
    fn part_names() {
        assert_eq!(part_file_name("talk.mp3", 1, None), "talk_part1.mp3");
        assert_eq!(part_file_name("talk.mp3", 12, Some("wav")), "talk_part12.wav");
        assert_eq!(part_file_name("talk.mp3", 2, Some(".ogg")), "talk_part2.ogg");
        assert_eq!(part_file_name("talk", 3, None), "talk_part3");
    }
}
