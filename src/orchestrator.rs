//! End-to-end chunked transcription run.
//!
//! The orchestrator decides whether a file needs chunking, drives the
//! planner and the transcription client across all segments strictly
//! sequentially, tolerates per-segment failures, and reassembles the
//! per-segment texts into one ordered transcript.
//!
//! Sequential dispatch is deliberate: it bounds memory to one in-flight
//! segment and stays inside typical remote-API rate limits, at the cost of
//! wall-clock time scaling linearly with segment count. Segment index order
//! is the sole ordering key for the final merge.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::client::{ClientError, OptionsError, SegmentPayload, Transcribe, TranscriptionOptions};
use crate::continuation::{ContinuationDecision, ContinuationPolicy};
use crate::media::{self, MediaFile};
use crate::metrics::Metrics;
use crate::planner::{self, PlanError};

// ── Limits ─────────────────────────────────────────────────────────────────────

/// Payload bound injected by the caller (sourced from `config::Config`).
/// An explicit parameter rather than an ambient constant, so tests can
/// substitute fake thresholds.
///
/// `Copy` is derived so the value moves freely into closures and tasks.
#[derive(Debug, Clone, Copy)]
pub struct PayloadLimits {
    /// Largest payload the remote endpoint accepts in a single request.
    /// Files above this are always chunked.
    pub max_single_payload_bytes: u64,
}

// ── Per-segment and aggregate results ──────────────────────────────────────────

/// Outcome of one attempted segment.
#[derive(Debug)]
pub enum SegmentOutcome {
    Success(String),
    Failure(ClientError),
}

/// Ledger entry retained for every attempted segment.
#[derive(Debug)]
pub struct SegmentResult {
    pub index: usize,
    pub outcome: SegmentOutcome,
}

/// Aggregate outcome of a run. Created once, at the end; persistence is the
/// caller's concern.
#[derive(Debug)]
pub struct PipelineResult {
    /// Space-joined concatenation of all successful segment texts, in
    /// ascending segment-index order. Word stitching across chunk edges is
    /// intentionally not attempted.
    pub merged_text: String,
    /// Segments attempted, including failures.
    pub attempted: usize,
    /// Segments whose transcription call failed.
    pub failed: usize,
    pub source_file_name: String,
    pub source_size_bytes: u64,
    pub elapsed: Duration,
}

// ── Error ──────────────────────────────────────────────────────────────────────

/// Run-level failure. Segment-level failures are recorded in the ledger and
/// do not surface here unless every segment failed or the policy is
/// fail-fast.
#[derive(Debug)]
pub enum PipelineError {
    /// Options violated their range invariants; raised before any network
    /// activity.
    Options(OptionsError),
    /// The split plan was structurally invalid; raised before any network
    /// activity.
    Plan(PlanError),
    /// The single non-chunked call failed, or a segment failed under the
    /// fail-fast policy.
    Transcription(ClientError),
    /// Every segment of a chunked run failed — distinct from a partial
    /// success, so callers can tell "some text recovered" from "nothing
    /// usable".
    AllSegmentsFailed { attempted: usize },
    /// Cancellation was requested; `completed` segments had finished out of
    /// `total` planned.
    Cancelled { completed: usize, total: usize },
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Options(e) => write!(f, "invalid options: {e}"),
            Self::Plan(e) => write!(f, "invalid split plan: {e}"),
            Self::Transcription(e) => write!(f, "transcription failed: {e}"),
            Self::AllSegmentsFailed { attempted } => {
                write!(f, "all {attempted} segments failed, no text recovered")
            }
            Self::Cancelled { completed, total } => {
                write!(f, "cancelled after {completed}/{total} segments")
            }
        }
    }
}

impl std::error::Error for PipelineError {}

// ── Orchestrator ───────────────────────────────────────────────────────────────

/// Synchronous per-segment progress callback: `(completed, total)`.
pub type ProgressFn = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Drives one transcription run end to end.
///
/// Generic over the [`Transcribe`] seam so tests can script the remote side.
/// All thresholds arrive through [`PayloadLimits`]; nothing is read from
/// ambient state.
pub struct Orchestrator<T> {
    client: T,
    limits: PayloadLimits,
    policy: ContinuationPolicy,
    metrics: Arc<Metrics>,
    progress: Option<ProgressFn>,
}

impl<T: Transcribe> Orchestrator<T> {
    pub fn new(client: T, limits: PayloadLimits, metrics: Arc<Metrics>) -> Self {
        Self {
            client,
            limits,
            policy: ContinuationPolicy::default(),
            metrics,
            progress: None,
        }
    }

    pub fn with_continuation_policy(mut self, policy: ContinuationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register a progress callback, invoked synchronously after every
    /// attempted segment with `(completed, total)`.
    pub fn with_progress(mut self, progress: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Run the pipeline on one file.
    ///
    /// # Execution flow
    /// 1. Validate options — before any network activity.
    /// 2. Decide chunking: size above the payload limit, or forced.
    /// 3. Non-chunked: one call on the whole file; its failure is the run's
    ///    failure.
    /// 4. Chunked: plan byte ranges, then for each segment in ascending
    ///    index order, strictly sequentially: slice → transcribe → record →
    ///    notify progress. A failed segment is recorded and the run
    ///    continues (unless the policy is fail-fast).
    /// 5. Merge successful texts in index order, space-joined. Zero
    ///    successes raise [`PipelineError::AllSegmentsFailed`].
    ///
    /// Cancellation is checked between segments and raced against the
    /// in-flight call, which is abandoned at best effort — the remote side
    /// may still complete it, but its result is discarded.
    pub async fn run(
        &self,
        file: &MediaFile,
        options: &TranscriptionOptions,
        mut cancel: CancelToken,
    ) -> Result<PipelineResult, PipelineError> {
        options.validate().map_err(PipelineError::Options)?;

        let started = Instant::now();
        let size = file.size_bytes();
        let needs_chunking = size > self.limits.max_single_payload_bytes || options.force_chunking;

        if !needs_chunking {
            return self.run_single(file, options, started).await;
        }

        let ranges =
            planner::plan_by_size(size, options.chunk_size_bytes).map_err(PipelineError::Plan)?;
        let total = ranges.len();

        tracing::info!(
            file = %file.name(),
            size_bytes = size,
            chunk_bytes = options.chunk_size_bytes,
            segments = total,
            "🔪 chunking for transcription"
        );

        let mut results: Vec<SegmentResult> = Vec::with_capacity(total);

        for range in &ranges {
            if cancel.is_cancelled() {
                tracing::warn!(
                    completed = results.len(),
                    total,
                    "🛑 run cancelled between segments"
                );
                self.metrics.inc_runs_failed();
                return Err(PipelineError::Cancelled { completed: results.len(), total });
            }

            let payload = SegmentPayload {
                bytes: file.slice(range.start, range.end),
                file_name: media::part_file_name(file.name(), range.index + 1, None),
                media_type: file.media_type().to_string(),
            };

            self.metrics.inc_segments_attempted();
            tracing::debug!(
                segment = range.index,
                start = range.start,
                end = range.end,
                "▶️  dispatching segment"
            );

            // Race the remote call against cancellation. `biased` checks the
            // cancel branch first so a triggered token wins over a response
            // that is already available.
            let outcome = tokio::select! {
                biased;

                _ = cancel.wait() => {
                    tracing::warn!(
                        segment = range.index,
                        completed = results.len(),
                        total,
                        "🛑 run cancelled, abandoning in-flight segment"
                    );
                    self.metrics.inc_runs_failed();
                    return Err(PipelineError::Cancelled { completed: results.len(), total });
                }

                outcome = self.client.transcribe(payload, options) => outcome,
            };

            match outcome {
                Ok(output) => {
                    self.metrics.inc_segments_succeeded();
                    tracing::info!(
                        segment = range.index,
                        chars = output.text.len(),
                        "✅ segment transcribed"
                    );
                    results.push(SegmentResult {
                        index: range.index,
                        outcome: SegmentOutcome::Success(output.text),
                    });
                }
                Err(e) => {
                    self.metrics.inc_segments_failed();
                    tracing::warn!(segment = range.index, error = %e, "⚠️  segment failed");
                    if self.policy.on_segment_failure() == ContinuationDecision::Abort {
                        self.metrics.inc_runs_failed();
                        return Err(PipelineError::Transcription(e));
                    }
                    results.push(SegmentResult {
                        index: range.index,
                        outcome: SegmentOutcome::Failure(e),
                    });
                }
            }

            if let Some(notify) = &self.progress {
                notify(results.len(), total);
            }
        }

        self.finish(file, results, started)
    }

    /// Non-chunked path: the whole file in one call.
    async fn run_single(
        &self,
        file: &MediaFile,
        options: &TranscriptionOptions,
        started: Instant,
    ) -> Result<PipelineResult, PipelineError> {
        tracing::info!(
            file = %file.name(),
            size_bytes = file.size_bytes(),
            "▶️  transcribing without chunking"
        );

        let payload = SegmentPayload {
            bytes: file.slice(0, file.size_bytes()),
            file_name: file.name().to_string(),
            media_type: file.media_type().to_string(),
        };

        self.metrics.inc_segments_attempted();
        let output = match self.client.transcribe(payload, options).await {
            Ok(output) => output,
            Err(e) => {
                self.metrics.inc_segments_failed();
                self.metrics.inc_runs_failed();
                return Err(PipelineError::Transcription(e));
            }
        };
        self.metrics.inc_segments_succeeded();

        if let Some(notify) = &self.progress {
            notify(1, 1);
        }

        self.metrics.inc_runs_completed();
        Ok(PipelineResult {
            merged_text: output.text,
            attempted: 1,
            failed: 0,
            source_file_name: file.name().to_string(),
            source_size_bytes: file.size_bytes(),
            elapsed: started.elapsed(),
        })
    }

    /// Merge the ledger into the final result. Results were pushed in
    /// ascending index order (dispatch is sequential), so the concatenation
    /// order is the segment order by construction.
    fn finish(
        &self,
        file: &MediaFile,
        results: Vec<SegmentResult>,
        started: Instant,
    ) -> Result<PipelineResult, PipelineError> {
        let attempted = results.len();
        let texts: Vec<&str> = results
            .iter()
            .filter_map(|r| match &r.outcome {
                SegmentOutcome::Success(text) => Some(text.as_str()),
                SegmentOutcome::Failure(_) => None,
            })
            .collect();
        let failed = attempted - texts.len();

        if texts.is_empty() {
            tracing::error!(attempted, "❌ no segment produced text");
            self.metrics.inc_runs_failed();
            return Err(PipelineError::AllSegmentsFailed { attempted });
        }

        let merged_text = texts.join(" ");
        tracing::info!(
            attempted,
            failed,
            chars = merged_text.len(),
            "✅ transcript assembled"
        );

        self.metrics.inc_runs_completed();
        Ok(PipelineResult {
            merged_text,
            attempted,
            failed,
            source_file_name: file.name().to_string(),
            source_size_bytes: file.size_bytes(),
            elapsed: started.elapsed(),
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ResponseFormat, TranscriptionOutput};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted backend: one canned outcome per expected call, in order.
    struct ScriptedTranscriber {
        outcomes: Mutex<Vec<Result<TranscriptionOutput, ClientError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedTranscriber {
        fn new(outcomes: Vec<Result<TranscriptionOutput, ClientError>>) -> Self {
            Self { outcomes: Mutex::new(outcomes), calls: AtomicUsize::new(0) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Transcribe for &ScriptedTranscriber {
        async fn transcribe(
            &self,
            _payload: SegmentPayload<'_>,
            _options: &TranscriptionOptions,
        ) -> Result<TranscriptionOutput, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes.lock().unwrap().remove(0)
        }
    }

    fn ok(text: &str) -> Result<TranscriptionOutput, ClientError> {
        Ok(TranscriptionOutput { text: text.to_string(), ..TranscriptionOutput::default() })
    }

    fn remote_err() -> Result<TranscriptionOutput, ClientError> {
        Err(ClientError::Remote { status: 500, message: "boom".into() })
    }

    fn options(chunk_size_bytes: u64) -> TranscriptionOptions {
        TranscriptionOptions {
            model: "whisper-1".into(),
            language: None,
            prompt: None,
            response_format: ResponseFormat::Json,
            temperature: 0.0,
            timestamp_granularities: Vec::new(),
            chunk_size_bytes,
            chunk_overlap_secs: 0.0,
            force_chunking: false,
        }
    }

    fn file(size: usize) -> MediaFile {
        MediaFile::new("talk.mp3", "audio/mpeg", vec![0u8; size])
    }

    fn orchestrator<'a>(
        client: &'a ScriptedTranscriber,
        max_single_payload_bytes: u64,
    ) -> Orchestrator<&'a ScriptedTranscriber> {
        Orchestrator::new(
            client,
            PayloadLimits { max_single_payload_bytes },
            Arc::new(Metrics::new()),
        )
    }

    fn token() -> CancelToken {
        // The handle is dropped untriggered: cancellation never fires and
        // `wait()` parks forever, which is exactly what these runs want.
        let (_handle, token) = crate::cancel::new_pair();
        token
    }

    #[tokio::test]
    async fn merges_chunk_texts_in_index_order() {
        // 60-byte file, 20-byte chunks → three segments "A" "B" "C".
        let client = ScriptedTranscriber::new(vec![ok("A"), ok("B"), ok("C")]);
        let orch = orchestrator(&client, 10);
        let result = orch.run(&file(60), &options(20), token()).await.unwrap();

        assert_eq!(result.merged_text, "A B C");
        assert_eq!(result.attempted, 3);
        assert_eq!(result.failed, 0);
        assert_eq!(result.source_size_bytes, 60);
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn continues_past_failed_segment() {
        let client = ScriptedTranscriber::new(vec![
            ok("one"),
            ok("two"),
            remote_err(),
            ok("four"),
            ok("five"),
        ]);
        let orch = orchestrator(&client, 10);
        let result = orch.run(&file(50), &options(10), token()).await.unwrap();

        assert_eq!(result.merged_text, "one two four five");
        assert_eq!(result.attempted, 5);
        assert_eq!(result.failed, 1);
        assert_eq!(client.calls(), 5, "segments after the failure must still be attempted");
    }

    #[tokio::test]
    async fn total_failure_is_distinct_from_partial() {
        let client = ScriptedTranscriber::new(vec![remote_err(), remote_err(), remote_err()]);
        let orch = orchestrator(&client, 10);
        let err = orch.run(&file(30), &options(10), token()).await.unwrap_err();

        assert!(matches!(err, PipelineError::AllSegmentsFailed { attempted: 3 }));
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn empty_result_counts_as_failure() {
        let client =
            ScriptedTranscriber::new(vec![ok("start"), Err(ClientError::EmptyResult), ok("end")]);
        let orch = orchestrator(&client, 10);
        let result = orch.run(&file(30), &options(10), token()).await.unwrap();

        assert_eq!(result.merged_text, "start end");
        assert_eq!(result.failed, 1);
    }

    #[tokio::test]
    async fn small_file_is_sent_in_one_call() {
        let client = ScriptedTranscriber::new(vec![ok("whole transcript")]);
        let orch = orchestrator(&client, 1024);
        let result = orch.run(&file(100), &options(10), token()).await.unwrap();

        assert_eq!(result.merged_text, "whole transcript");
        assert_eq!(result.attempted, 1);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn single_call_failure_is_run_failure() {
        let client = ScriptedTranscriber::new(vec![remote_err()]);
        let orch = orchestrator(&client, 1024);
        let err = orch.run(&file(100), &options(10), token()).await.unwrap_err();

        assert!(matches!(err, PipelineError::Transcription(ClientError::Remote { .. })));
    }

    #[tokio::test]
    async fn force_chunking_overrides_size_threshold() {
        let client = ScriptedTranscriber::new(vec![ok("a"), ok("b")]);
        let orch = orchestrator(&client, 1024);
        let mut opts = options(10);
        opts.force_chunking = true;

        let result = orch.run(&file(20), &opts, token()).await.unwrap();
        assert_eq!(result.merged_text, "a b");
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn progress_is_reported_after_every_segment() {
        let client = ScriptedTranscriber::new(vec![ok("a"), remote_err(), ok("c")]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_cb = Arc::clone(&seen);

        let orch = orchestrator(&client, 10).with_progress(move |done, total| {
            seen_in_cb.lock().unwrap().push((done, total));
        });
        orch.run(&file(30), &options(10), token()).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn fail_fast_aborts_on_first_failure() {
        let client = ScriptedTranscriber::new(vec![ok("a"), remote_err(), ok("c")]);
        let orch = orchestrator(&client, 10)
            .with_continuation_policy(ContinuationPolicy::FailFast);
        let err = orch.run(&file(30), &options(10), token()).await.unwrap_err();

        assert!(matches!(err, PipelineError::Transcription(_)));
        assert_eq!(client.calls(), 2, "third segment must not be attempted");
    }

    #[tokio::test]
    async fn invalid_options_fail_before_any_call() {
        let client = ScriptedTranscriber::new(Vec::new());
        let orch = orchestrator(&client, 10);
        let mut opts = options(10);
        opts.temperature = 2.0;

        let err = orch.run(&file(30), &opts, token()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Options(_)));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn invalid_chunk_size_fails_before_any_call() {
        let client = ScriptedTranscriber::new(Vec::new());
        let orch = orchestrator(&client, 10);
        let err = orch.run(&file(30), &options(0), token()).await.unwrap_err();

        assert!(matches!(err, PipelineError::Plan(PlanError::ZeroChunkSize)));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn pre_cancelled_token_stops_before_any_call() {
        let client = ScriptedTranscriber::new(vec![ok("a"), ok("b"), ok("c")]);
        let orch = orchestrator(&client, 10);
        let (handle, cancel) = crate::cancel::new_pair();
        handle.trigger();

        let err = orch.run(&file(30), &options(10), cancel).await.unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled { completed: 0, total: 3 }));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn metrics_reflect_segment_outcomes() {
        let client = ScriptedTranscriber::new(vec![ok("a"), remote_err(), ok("c")]);
        let metrics = Arc::new(Metrics::new());
        let orch = Orchestrator::new(
            &client,
            PayloadLimits { max_single_payload_bytes: 10 },
            Arc::clone(&metrics),
        );
        orch.run(&file(30), &options(10), token()).await.unwrap();

        let s = metrics.snapshot();
        assert_eq!(s.segments_attempted, 3);
        assert_eq!(s.segments_succeeded, 2);
        assert_eq!(s.segments_failed, 1);
        assert_eq!(s.runs_completed, 1);
    }
}
