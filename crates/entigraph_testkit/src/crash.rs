//! Crash recovery testing for EntiGraph.
//!
//! A commit is durable once its frame is completely in the journal. This
//! module records the journal after every save and then replays every
//! possible crash point, checking that recovery lands on a committed state.
//!
//! ## Test Strategy
//!
//! 1. **Torn append** - the journal is cut inside a frame
//! 2. **Failed append** - the backend refuses the write
//! 3. **Clean cut** - the journal ends exactly on a frame boundary
//!
//! ## Usage
//!
//! ```rust,ignore
//! use entigraph_testkit::crash::CrashRecoveryHarness;
//!
//! let mut harness = CrashRecoveryHarness::new(people_registry);
//! harness.commit(|ctx| { ctx.create("Person", person("a", 1))?; Ok(()) });
//! harness.verify_every_cut();
//! ```

use entigraph_core::{Config, Context, CoreResult, EntityRegistry};
use entigraph_storage::InMemoryJournal;

/// Result of recovering from one crash point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashRecoveryResult {
    /// Length the journal was cut to.
    pub cut: usize,
    /// Commits expected to survive the cut.
    pub expected_commits: u64,
    /// Committed sequence after recovery.
    pub recovered_commits: u64,
    /// Instances expected after recovery.
    pub expected_instances: usize,
    /// Instances present after recovery.
    pub recovered_instances: usize,
}

impl CrashRecoveryResult {
    /// Returns true if recovery landed on the expected commit.
    pub fn passed(&self) -> bool {
        self.expected_commits == self.recovered_commits
            && self.expected_instances == self.recovered_instances
    }
}

/// Records a context's journal after each commit for crash replay.
pub struct CrashRecoveryHarness {
    registry: fn() -> EntityRegistry,
    journal: InMemoryJournal,
    ctx: Context,
    /// Journal length and instance count after each commit.
    checkpoints: Vec<(usize, usize)>,
}

impl CrashRecoveryHarness {
    /// Creates a harness over an empty in-memory journal.
    pub fn new(registry: fn() -> EntityRegistry) -> Self {
        let journal = InMemoryJournal::new();
        let ctx = Context::with_backend(registry(), Config::default(), Box::new(journal.clone()))
            .expect("Failed to open context");
        Self {
            registry,
            journal,
            ctx,
            checkpoints: vec![(0, 0)],
        }
    }

    /// Returns the live context.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Returns the shared journal backend.
    pub fn journal(&self) -> &InMemoryJournal {
        &self.journal
    }

    /// Runs `f` and saves, recording the resulting journal length.
    ///
    /// # Panics
    ///
    /// Panics if `f` or the save fails.
    pub fn commit<F>(&mut self, f: F)
    where
        F: FnOnce(&Context) -> CoreResult<()>,
    {
        self.ctx
            .transaction(f)
            .expect("Failed to commit changes");
        self.checkpoints
            .push((self.journal.data().len(), self.ctx.snapshot().len()));
    }

    /// Reopens a context over the journal cut to `cut` bytes.
    pub fn recover_at(&self, cut: usize) -> CrashRecoveryResult {
        let data = self.journal.data();
        let cut = cut.min(data.len());
        let ctx = Context::with_backend(
            (self.registry)(),
            Config::default(),
            Box::new(InMemoryJournal::with_data(data[..cut].to_vec())),
        )
        .expect("Recovery should never fail on a truncated journal");

        let survivors = self
            .checkpoints
            .iter()
            .rposition(|(len, _)| *len <= cut)
            .unwrap_or(0);
        let snapshot = ctx.snapshot();

        CrashRecoveryResult {
            cut,
            expected_commits: survivors as u64,
            recovered_commits: snapshot.sequence().as_u64(),
            expected_instances: self.checkpoints[survivors].1,
            recovered_instances: snapshot.len(),
        }
    }

    /// Recovers from every possible cut of the journal.
    pub fn recover_every_cut(&self) -> Vec<CrashRecoveryResult> {
        let len = self.journal.data().len();
        (0..=len).map(|cut| self.recover_at(cut)).collect()
    }

    /// Asserts that every cut recovers to the last complete commit.
    pub fn verify_every_cut(&self) {
        for result in self.recover_every_cut() {
            assert!(result.passed(), "recovery mismatch: {result:?}");
        }
    }
}
