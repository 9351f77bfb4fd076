//! The commit log: commit batches framed into a storage journal.

use super::record::CommitBatch;
use crate::error::{CoreError, CoreResult};
use entigraph_storage::{Journal, JournalBackend};
use parking_lot::Mutex;
use std::time::Instant;
use tracing::debug;

/// Serializes access to the journal and maps its failures onto commits.
#[derive(Debug)]
pub(crate) struct CommitLog {
    journal: Mutex<Journal>,
}

impl CommitLog {
    pub(crate) fn new(backend: Box<dyn JournalBackend>, sync_on_commit: bool) -> Self {
        Self {
            journal: Mutex::new(Journal::new(backend, sync_on_commit)),
        }
    }

    /// Reads every committed batch, trimming a torn tail.
    ///
    /// Sequences must strictly increase from one batch to the next.
    pub(crate) fn recover(&self) -> CoreResult<Vec<CommitBatch>> {
        let frames = self.journal.lock().recover()?;
        let mut batches: Vec<CommitBatch> = Vec::with_capacity(frames.len());
        for frame in frames {
            let batch = CommitBatch::decode(&frame.payload).map_err(|e| {
                CoreError::codec(format!("batch at offset {}: {e}", frame.offset))
            })?;
            if let Some(previous) = batches.last() {
                if batch.sequence <= previous.sequence {
                    return Err(CoreError::codec(format!(
                        "batch at offset {} has sequence {} after {}",
                        frame.offset, batch.sequence, previous.sequence
                    )));
                }
            }
            batches.push(batch);
        }
        debug!(batches = batches.len(), "recovered commit log");
        Ok(batches)
    }

    /// Appends one batch, all or nothing.
    ///
    /// If the append finishes after `deadline` the frame is cut off again and
    /// the commit fails.
    pub(crate) fn append(&self, batch: &CommitBatch, deadline: Instant) -> CoreResult<()> {
        let payload = batch.encode()?;
        let mut journal = self
            .journal
            .try_lock_until(deadline)
            .ok_or_else(|| CoreError::commit_failed("timed out waiting for the journal"))?;

        let before = journal.size()?;
        journal
            .append(&payload)
            .map_err(|e| CoreError::commit_failed(format!("journal append failed: {e}")))?;

        if Instant::now() > deadline {
            if let Err(e) = journal.truncate(before) {
                return Err(CoreError::commit_failed(format!(
                    "timed out during journal append, and the frame could not be removed: {e}"
                )));
            }
            return Err(CoreError::commit_failed("timed out during journal append"));
        }

        debug!(sequence = %batch.sequence, changes = batch.changes.len(), bytes = payload.len(), "appended commit batch");
        Ok(())
    }

    /// Replaces the whole log with `batches`.
    pub(crate) fn rewrite(&self, batches: &[CommitBatch]) -> CoreResult<()> {
        let payloads = batches
            .iter()
            .map(CommitBatch::encode)
            .collect::<CoreResult<Vec<_>>>()?;
        self.journal.lock().rewrite(&payloads)?;
        Ok(())
    }

    /// Returns the journal size in bytes.
    pub(crate) fn size(&self) -> CoreResult<u64> {
        Ok(self.journal.lock().size()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::ChangeRecord;
    use crate::types::{CommitSequence, ObjectId};
    use entigraph_storage::InMemoryJournal;
    use std::time::Duration;

    fn batch(seq: u64) -> CommitBatch {
        CommitBatch {
            sequence: CommitSequence::new(seq),
            changes: vec![ChangeRecord::Delete {
                id: ObjectId::new(),
                entity: "Person".into(),
            }],
        }
    }

    fn later() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    #[test]
    fn append_and_recover() {
        let backend = InMemoryJournal::new();
        let log = CommitLog::new(Box::new(backend.clone()), true);
        log.append(&batch(1), later()).unwrap();
        log.append(&batch(2), later()).unwrap();

        let reopened = CommitLog::new(Box::new(backend), true);
        let batches = reopened.recover().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].sequence, CommitSequence::new(2));
    }

    #[test]
    fn non_increasing_sequence_is_a_codec_error() {
        let backend = InMemoryJournal::new();
        let log = CommitLog::new(Box::new(backend.clone()), true);
        log.append(&batch(1), later()).unwrap();
        log.append(&batch(2), later()).unwrap();
        log.append(&batch(2), later()).unwrap();

        let reopened = CommitLog::new(Box::new(backend), true);
        assert!(matches!(reopened.recover(), Err(CoreError::Codec { .. })));
    }

    #[test]
    fn failed_write_is_commit_failed_and_leaves_nothing() {
        let backend = InMemoryJournal::new();
        let log = CommitLog::new(Box::new(backend.clone()), true);
        log.append(&batch(1), later()).unwrap();
        let size = log.size().unwrap();

        backend.set_fail_writes(true);
        assert!(matches!(
            log.append(&batch(2), later()),
            Err(CoreError::CommitFailed { .. })
        ));
        backend.set_fail_writes(false);
        assert_eq!(log.size().unwrap(), size);
    }

    #[test]
    fn overrun_deadline_removes_frame() {
        let backend = InMemoryJournal::new();
        let log = CommitLog::new(Box::new(backend), true);
        let past = Instant::now();
        std::thread::sleep(Duration::from_millis(2));

        assert!(matches!(
            log.append(&batch(1), past),
            Err(CoreError::CommitFailed { .. })
        ));
        assert_eq!(log.size().unwrap(), 0);
        assert!(log.recover().unwrap().is_empty());
    }

    #[test]
    fn rewrite_replaces_content() {
        let backend = InMemoryJournal::new();
        let log = CommitLog::new(Box::new(backend), true);
        for seq in 1..=3 {
            log.append(&batch(seq), later()).unwrap();
        }
        log.rewrite(&[batch(3)]).unwrap();
        let batches = log.recover().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].sequence, CommitSequence::new(3));
    }
}
