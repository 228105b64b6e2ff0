use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_extracted: AtomicU64,
    documents_truncated: AtomicU64,
    summaries_generated: AtomicU64,
    answers_generated: AtomicU64,
    model_refusals: AtomicU64,
    transport_errors: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a document whose text was extracted successfully.
    pub fn record_extraction(&self) {
        self.documents_extracted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a document that exceeded the summarization budget.
    pub fn record_truncation(&self) {
        self.documents_truncated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a summary returned by the model.
    pub fn record_summary(&self) {
        self.summaries_generated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an answer returned by the model.
    pub fn record_answer(&self) {
        self.answers_generated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed model call without usable structured output.
    pub fn record_refusal(&self) {
        self.model_refusals.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failure to reach the model backend.
    pub fn record_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_extracted: self.documents_extracted.load(Ordering::Relaxed),
            documents_truncated: self.documents_truncated.load(Ordering::Relaxed),
            summaries_generated: self.summaries_generated.load(Ordering::Relaxed),
            answers_generated: self.answers_generated.load(Ordering::Relaxed),
            model_refusals: self.model_refusals.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents extracted since startup.
    pub documents_extracted: u64,
    /// Documents cut down to the summarization budget.
    pub documents_truncated: u64,
    /// Summaries produced.
    pub summaries_generated: u64,
    /// Answers produced.
    pub answers_generated: u64,
    /// Model calls that completed without usable output.
    pub model_refusals: u64,
    /// Model calls that failed in transport.
    pub transport_errors: u64,
}
