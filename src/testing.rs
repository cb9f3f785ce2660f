//! In-memory fakes for unit tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::config::{EffectiveConfig, ResolvedBenchmark};
use crate::error::{BenchmarkError, VcsError};
use crate::parse::Measurement;
use crate::runner::{BenchRunner, Invocation, RunOutput};
use crate::vcs::{RevisionId, SourceControl, Tag};

pub fn rev(id: &str) -> RevisionId {
    RevisionId(id.to_string())
}

pub fn resolved(name: &str, version: &str) -> ResolvedBenchmark {
    ResolvedBenchmark {
        name: name.to_string(),
        package: "./pkg".to_string(),
        unique_name: name.to_string(),
        version: version.to_string(),
        config: EffectiveConfig::default(),
    }
}

pub fn resolved_with(name: &str, threshold: f64, compare: &str) -> ResolvedBenchmark {
    let mut b = resolved(name, "");
    b.config.threshold = threshold;
    b.config.compare = compare.to_string();
    b
}

pub fn measurement(name: &str, ns_per_op: f64, bytes: u64) -> Measurement {
    Measurement {
        name: name.to_string(),
        iterations: 1,
        ns_per_op,
        allocated_bytes_per_op: bytes,
        ..Default::default()
    }
}

/// Revisions named `broken*` fail to reset; everything else resolves to
/// itself. `resets` records only successful resets.
pub struct FakeScm {
    head: Rc<RefCell<RevisionId>>,
    clean: bool,
    tags: Vec<Tag>,
    resets: RefCell<Vec<RevisionId>>,
    reset_attempts: RefCell<usize>,
    reset_limit: Option<usize>,
}

impl FakeScm {
    pub fn new(head: &str) -> Self {
        Self {
            head: Rc::new(RefCell::new(rev(head))),
            clean: true,
            tags: Vec::new(),
            resets: RefCell::new(Vec::new()),
            reset_attempts: RefCell::new(0),
            reset_limit: None,
        }
    }

    /// Every reset after the first `limit` successful ones fails.
    pub fn failing_after(mut self, limit: usize) -> Self {
        self.reset_limit = Some(limit);
        self
    }

    pub fn dirty(mut self) -> Self {
        self.clean = false;
        self
    }

    pub fn with_tag(mut self, name: &str, target: &str) -> Self {
        self.tags.push(Tag {
            name: name.to_string(),
            target: rev(target),
        });
        self
    }

    /// Shared view of the checked-out revision, for [`FakeRunner::per_revision`].
    pub fn head_cell(&self) -> Rc<RefCell<RevisionId>> {
        Rc::clone(&self.head)
    }

    pub fn resets(&self) -> Vec<RevisionId> {
        self.resets.borrow().clone()
    }

    pub fn reset_attempts(&self) -> usize {
        *self.reset_attempts.borrow()
    }
}

impl SourceControl for FakeScm {
    fn head(&self) -> Result<RevisionId, VcsError> {
        Ok(self.head.borrow().clone())
    }

    fn resolve(&self, reference: &str) -> Result<RevisionId, VcsError> {
        match reference {
            "HEAD" => self.head(),
            r if r.starts_with("nope") => Err(VcsError::UnknownRevision(r.to_string())),
            r => Ok(rev(r)),
        }
    }

    fn tags(&self) -> Result<Vec<Tag>, VcsError> {
        Ok(self.tags.clone())
    }

    fn is_clean(&self) -> Result<bool, VcsError> {
        Ok(self.clean)
    }

    fn hard_reset(&self, revision: &RevisionId) -> Result<(), VcsError> {
        *self.reset_attempts.borrow_mut() += 1;
        let exhausted = self
            .reset_limit
            .is_some_and(|limit| self.resets.borrow().len() >= limit);
        if exhausted || revision.0.starts_with("broken") {
            return Err(VcsError::UnknownRevision(revision.0.clone()));
        }
        *self.head.borrow_mut() = revision.clone();
        self.resets.borrow_mut().push(revision.clone());
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Output(String),
    NoTarget,
    Failure,
}

/// Answers invocations by the `-bench` filter. With
/// [`FakeRunner::per_revision`] the lookup key becomes `revision/name`.
#[derive(Default)]
pub struct FakeRunner {
    scripted: HashMap<String, Scripted>,
    invocations: RefCell<Vec<Invocation>>,
    current_revision: Option<Rc<RefCell<RevisionId>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, key: &str, stdout: &str) -> Self {
        self.scripted
            .insert(key.to_string(), Scripted::Output(stdout.to_string()));
        self
    }

    pub fn with_no_target(mut self, key: &str) -> Self {
        self.scripted.insert(key.to_string(), Scripted::NoTarget);
        self
    }

    pub fn with_failure(mut self, key: &str) -> Self {
        self.scripted.insert(key.to_string(), Scripted::Failure);
        self
    }

    pub fn per_revision(mut self, cell: Rc<RefCell<RevisionId>>) -> Self {
        self.current_revision = Some(cell);
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.borrow().clone()
    }
}

impl BenchRunner for FakeRunner {
    fn run(&self, invocation: &Invocation) -> Result<RunOutput, BenchmarkError> {
        self.invocations.borrow_mut().push(invocation.clone());
        let name = invocation
            .args
            .iter()
            .position(|a| a == "-bench")
            .and_then(|i| invocation.args.get(i + 1))
            .cloned()
            .unwrap_or_default();
        let key = match &self.current_revision {
            Some(cell) => format!("{}/{}", cell.borrow().0, name),
            None => name,
        };

        match self.scripted.get(&key) {
            Some(Scripted::Output(out)) => Ok(RunOutput::Completed(out.clone())),
            Some(Scripted::NoTarget) => Ok(RunOutput::NoMatchingTarget),
            Some(Scripted::Failure) | None => Err(BenchmarkError::Execution {
                command: invocation.to_string(),
                status: "exit status: 1".to_string(),
            }),
        }
    }
}
