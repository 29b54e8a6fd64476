use crate::models::error::{DecodeError, SinkError};
use crate::models::scan_result::ScanResult;
use crate::storage::journal::{ScanJournal, ScanRecord};
use crate::traits::result_sink::ResultSink;

/// Wraps another sink and appends one [`ScanRecord`] per cycle to a journal.
///
/// Payloads and failures are forwarded to the inner sink unchanged. The
/// record is written when the cycle summary arrives; a journal write failure
/// is logged and the summary still reaches the inner sink.
pub struct JournalingSink<K: ResultSink> {
    inner: K,
    journal: ScanJournal,
    payloads: Vec<Vec<u8>>,
    failures: Vec<(usize, DecodeError)>,
}

impl<K: ResultSink> JournalingSink<K> {
    pub fn new(inner: K, journal: ScanJournal) -> Self {
        Self {
            inner,
            journal,
            payloads: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn inner(&self) -> &K {
        &self.inner
    }

    pub fn journal(&self) -> &ScanJournal {
        &self.journal
    }

    pub fn into_inner(self) -> K {
        self.inner
    }
}

impl<K: ResultSink> ResultSink for JournalingSink<K> {
    fn start_cycle(&mut self) {
        if !self.payloads.is_empty() || !self.failures.is_empty() {
            log::debug!(
                "journal: dropping {} payloads and {} failures from an aborted scan",
                self.payloads.len(),
                self.failures.len()
            );
        }
        self.payloads.clear();
        self.failures.clear();
        self.inner.start_cycle();
    }

    fn emit(&mut self, payload: &[u8]) -> Result<(), SinkError> {
        self.payloads.push(payload.to_vec());
        self.inner.emit(payload)
    }

    fn emit_error(&mut self, index: usize, reason: &DecodeError) {
        self.failures.push((index, *reason));
        self.inner.emit_error(index, reason);
    }

    fn summary(&mut self, result: ScanResult) {
        let record = ScanRecord::new(result, &self.payloads, &self.failures);
        self.payloads.clear();
        self.failures.clear();

        match self.journal.append(&record) {
            Ok(()) => log::debug!("journal: recorded scan {}", record.id),
            Err(e) => log::warn!("journal: {} ({})", e, self.journal.path().display()),
        }
        self.inner.summary(result);
    }
}
