//! Concurrency tests for the pipeline runner.
//!
//! These run many workers per stage over shared line stores and check that every line is
//! transformed exactly once, reaches a terminal state, and that failures terminate the run.

use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use linestage_lib::completion::CompletionTracker;
use linestage_lib::errors::LineStageError;
use linestage_lib::line_store::{LineState, LineStore};
use linestage_lib::pipeline::{
    PipelineConfig, StageCounts, StageRole, WriteRetryPolicy, run_pipeline,
    run_pipeline_with_tracker,
};
use linestage_lib::sink::{CollectingSink, LineSink, SharedWriterSink};
use rstest::rstest;

use crate::helpers::{assert_same_lines_any_order, numbered_lines, transformed};

fn config(counts: StageCounts) -> PipelineConfig {
    PipelineConfig::new(counts).with_max_delay(Duration::from_micros(30)).with_seed(Some(42))
}

/// Fails every append of one specific line.
struct FailingLineSink {
    inner: CollectingSink,
    failing_index: usize,
    attempts: AtomicUsize,
}

impl LineSink for FailingLineSink {
    fn append(&self, index: usize, line: &str) -> io::Result<()> {
        if index == self.failing_index {
            self.attempts.fetch_add(1, Ordering::Relaxed);
            return Err(io::Error::other("simulated disk error"));
        }
        self.inner.append(index, line)
    }
}

/// Fails the first append of every line, then succeeds.
#[derive(Default)]
struct FlakySink {
    inner: CollectingSink,
    seen: parking_lot::Mutex<HashSet<usize>>,
}

impl LineSink for FlakySink {
    fn append(&self, index: usize, line: &str) -> io::Result<()> {
        if self.seen.lock().insert(index) {
            return Err(io::Error::other("transient"));
        }
        self.inner.append(index, line)
    }
}

struct PanickingSink;

impl LineSink for PanickingSink {
    fn append(&self, _index: usize, _line: &str) -> io::Result<()> {
        panic!("sink exploded");
    }
}

#[test]
fn test_round_trip_two_lines() {
    let store = LineStore::new(["ab cd", "EF"]);
    let sink = CollectingSink::new();
    let summary = run_pipeline(&config(StageCounts::default()), &store, &sink).unwrap();
    assert_eq!((summary.total, summary.written, summary.failed), (2, 2, 0));
    let lines: HashSet<String> = sink.into_lines().into_iter().collect();
    assert_eq!(lines, HashSet::from(["AB_CD".to_string(), "EF".to_string()]));
}

#[test]
fn test_stress_500_lines() {
    let input = numbered_lines(500, 7);
    let store = LineStore::new(input.iter().cloned());
    let sink = CollectingSink::new();
    let summary = run_pipeline(&config(StageCounts::new(4, 3, 3, 2)), &store, &sink).unwrap();

    assert!(summary.is_success());
    assert_eq!(summary.written, 500);
    assert_eq!(store.count_in_state(LineState::Written), 500);

    let expected: Vec<String> = input.iter().map(|l| transformed(l)).collect();
    assert_same_lines_any_order(&sink.into_lines(), &expected);
}

#[rstest]
#[case(StageCounts::new(1, 1, 1, 1))]
#[case(StageCounts::new(1, 4, 4, 1))]
#[case(StageCounts::new(3, 1, 2, 5))]
#[case(StageCounts::new(8, 8, 8, 8))]
fn test_thread_mixes_write_every_line_once(#[case] counts: StageCounts) {
    let input = numbered_lines(120, 3);
    let store = LineStore::new(input.iter().cloned());
    let sink = CollectingSink::new();
    let summary = run_pipeline(&config(counts), &store, &sink).unwrap();
    assert!(summary.is_success());
    let expected: Vec<String> = input.iter().map(|l| transformed(l)).collect();
    assert_same_lines_any_order(&sink.into_lines(), &expected);
}

#[test]
fn test_transforms_ahead_of_readers_still_finish() {
    // No delay and many transform workers make them overtake the single reader.
    let input = numbered_lines(300, 11);
    let store = LineStore::new(input.iter().cloned());
    let sink = CollectingSink::new();
    let config = PipelineConfig::new(StageCounts::new(1, 6, 6, 2)).with_max_delay(Duration::ZERO);
    let summary = run_pipeline(&config, &store, &sink).unwrap();
    assert!(summary.is_success());
    assert_eq!(sink.len(), 300);
}

#[test]
fn test_repeated_small_runs_terminate() {
    for round in 0..25 {
        let store = LineStore::new(["a b", "", "c"]);
        let sink = CollectingSink::new();
        let config = PipelineConfig::new(StageCounts::new(2, 2, 2, 2))
            .with_max_delay(Duration::ZERO)
            .with_seed(Some(round));
        let summary = run_pipeline(&config, &store, &sink).unwrap();
        assert_eq!(summary.written, 3, "round {round}");
    }
}

#[test]
fn test_state_history_is_monotonic() {
    let input = numbered_lines(80, 5);
    let store = LineStore::with_transition_log(input.iter().cloned(), true);
    let sink = CollectingSink::new();
    run_pipeline(&config(StageCounts::new(2, 2, 2, 2)), &store, &sink).unwrap();

    for line in store.snapshot() {
        assert_eq!(
            line.history.as_deref(),
            Some(
                &[LineState::Unread, LineState::Read, LineState::TransformsDone, LineState::Written]
                    [..]
            ),
            "line {}",
            line.index
        );
        assert!(line.upper_applied && line.replace_applied);
    }
}

#[test]
fn test_written_count_tracks_written_lines_during_run() {
    let input = numbered_lines(500, 13);
    let store = LineStore::new(input.iter().cloned());
    let tracker = CompletionTracker::new(500);
    let sink = CollectingSink::new();
    let running = AtomicBool::new(true);

    let (summary, observations) = thread::scope(|scope| {
        let observer = scope.spawn(|| {
            let mut observations = 0u32;
            let mut last = 0;
            while running.load(Ordering::Acquire) {
                // Counter and state change together under the line lock, so a scan of the
                // Written lines is bracketed by the counter read before and after it.
                let before = tracker.written();
                let written_lines = store.count_in_state(LineState::Written) as u64;
                let after = tracker.written();
                assert!(before >= last, "written went backwards: {last} -> {before}");
                assert!(
                    before <= written_lines && written_lines <= after,
                    "written {before}..{after} but {written_lines} lines are Written"
                );
                last = after;
                observations += 1;
            }
            observations
        });
        let config = config(StageCounts::new(4, 3, 3, 2));
        let summary = run_pipeline_with_tracker(&config, &store, &sink, &tracker);
        running.store(false, Ordering::Release);
        (summary, observer.join().unwrap())
    });

    assert!(summary.unwrap().is_success());
    assert!(observations > 0);
    assert_eq!(tracker.written(), store.count_in_state(LineState::Written) as u64);
    assert_eq!(tracker.written(), 500);
}

#[test]
fn test_used_tracker_is_rejected() {
    let store = LineStore::new(["a", "b"]);
    let tracker = CompletionTracker::new(2);
    tracker.record_written();
    let err = run_pipeline_with_tracker(
        &config(StageCounts::default()),
        &store,
        &CollectingSink::new(),
        &tracker,
    )
    .unwrap_err();
    assert!(matches!(err, LineStageError::InvalidParameter { .. }));
    assert_eq!(store.count_in_state(LineState::Unread), 2);
}

#[test]
fn test_input_order_output_matches_input() {
    let input = numbered_lines(200, 9);
    let store = LineStore::new(input.iter().cloned());
    let sink = CollectingSink::new();
    run_pipeline(&config(StageCounts::new(3, 2, 2, 3)), &store, &sink).unwrap();

    let ordered: Vec<String> = sink.into_ordered().into_iter().map(|(_, line)| line).collect();
    let expected: Vec<String> = input.iter().map(|l| transformed(l)).collect();
    assert_eq!(ordered, expected);
}

#[test]
fn test_single_failing_line_terminates_with_partial_summary() {
    let input = numbered_lines(500, 1);
    let store = LineStore::new(input.iter().cloned());
    let sink = FailingLineSink {
        inner: CollectingSink::new(),
        failing_index: 250,
        attempts: AtomicUsize::new(0),
    };
    let config = config(StageCounts::new(4, 3, 3, 2)).with_retry(WriteRetryPolicy::default());
    let summary = run_pipeline(&config, &store, &sink).unwrap();

    assert_eq!(summary.written, 499);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failed_indices, vec![250]);
    assert_eq!(sink.attempts.load(Ordering::Relaxed), 3);
    assert_eq!(store.get(250).unwrap().state, LineState::Failed);
    assert!(matches!(
        summary.into_result(),
        Err(LineStageError::IncompleteOutput { written: 499, failed: 1, total: 500 })
    ));
}

#[test]
fn test_transient_failures_are_retried() {
    let input = numbered_lines(50, 2);
    let store = LineStore::new(input.iter().cloned());
    let sink = FlakySink::default();
    let config = config(StageCounts::new(2, 2, 2, 3)).with_stats(true);
    let summary = run_pipeline(&config, &store, &sink).unwrap();

    assert!(summary.is_success());
    assert_eq!(sink.inner.len(), 50);
    let writer = summary.stats.as_ref().unwrap().role(StageRole::Writer);
    assert_eq!(writer.retries(), 50);
    assert_eq!(writer.failures(), 0);
}

#[test]
fn test_worker_panic_is_reported() {
    let store = LineStore::new(["a", "b", "c"]);
    let err = run_pipeline(&config(StageCounts::new(1, 1, 1, 2)), &store, &PanickingSink)
        .unwrap_err();
    match err {
        LineStageError::WorkerPanicked { worker, message } => {
            assert!(worker.starts_with("writer-"));
            assert_eq!(message, "sink exploded");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_shared_writer_sink() {
    let input = numbered_lines(100, 4);
    let store = LineStore::new(input.iter().cloned());
    let sink = SharedWriterSink::new(Vec::new());
    run_pipeline(&config(StageCounts::new(2, 2, 2, 4)), &store, &sink).unwrap();

    let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
    let lines: Vec<String> = text.lines().map(String::from).collect();
    let expected: Vec<String> = input.iter().map(|l| transformed(l)).collect();
    assert_same_lines_any_order(&lines, &expected);
}
