//! Multi-step document mutations for one logical user action.
//!
//! Each step is a named future. A failing step is logged and does not roll
//! back the steps already applied; the caller gets a `MutationReport` whose
//! success is the logical AND of every step that ran.

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use tracing::error;

use crate::error::ApiError;
use crate::store::{CollectionPath, DocPath, Document, DocumentStore, FieldUpdate, StoreError};

pub type StepFuture<'a> = BoxFuture<'a, Result<(), StoreError>>;

pub fn set_doc(store: &dyn DocumentStore, path: DocPath, doc: Document) -> StepFuture<'_> {
    async move { store.set(&path, doc).await }.boxed()
}

pub fn update_doc(store: &dyn DocumentStore, path: DocPath, updates: Vec<FieldUpdate>) -> StepFuture<'_> {
    async move { store.update(&path, updates).await }.boxed()
}

/// Deleting an already-missing document counts as success
pub fn delete_doc(store: &dyn DocumentStore, path: DocPath) -> StepFuture<'_> {
    async move { store.delete(&path).await.map(|_| ()) }.boxed()
}

pub fn delete_collection(store: &dyn DocumentStore, collection: CollectionPath) -> StepFuture<'_> {
    async move { store.delete_collection(&collection).await.map(|_| ()) }.boxed()
}

struct Step<'a> {
    name: &'static str,
    required: bool,
    fut: StepFuture<'a>,
}

pub struct MutationPlan<'a> {
    action: &'static str,
    steps: Vec<Step<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationReport {
    pub action: &'static str,
    pub applied: Vec<&'static str>,
    pub failed: Vec<&'static str>,
    /// Steps never started because a required step failed first
    pub skipped: Vec<&'static str>,
}

impl<'a> MutationPlan<'a> {
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, name: &'static str, fut: StepFuture<'a>) -> Self {
        self.steps.push(Step {
            name,
            required: false,
            fut,
        });
        self
    }

    /// A step whose failure stops a sequential run
    pub fn required_step(mut self, name: &'static str, fut: StepFuture<'a>) -> Self {
        self.steps.push(Step {
            name,
            required: true,
            fut,
        });
        self
    }

    /// Runs steps one after another
    pub async fn run_sequential(self) -> MutationReport {
        let mut report = MutationReport::new(self.action);
        let mut steps = self.steps.into_iter();

        while let Some(step) = steps.next() {
            match step.fut.await {
                Ok(()) => report.applied.push(step.name),
                Err(e) => {
                    error!(action = report.action, step = step.name, error = %e, "mutation step failed");
                    report.failed.push(step.name);
                    if step.required {
                        report.skipped.extend(steps.by_ref().map(|s| s.name));
                        break;
                    }
                }
            }
        }

        report
    }

    /// Runs every step concurrently and waits for all of them
    pub async fn run_parallel(self) -> MutationReport {
        let mut report = MutationReport::new(self.action);
        let (names, futs): (Vec<_>, Vec<_>) = self.steps.into_iter().map(|s| (s.name, s.fut)).unzip();

        for (name, result) in names.into_iter().zip(join_all(futs).await) {
            match result {
                Ok(()) => report.applied.push(name),
                Err(e) => {
                    error!(action = report.action, step = name, error = %e, "mutation step failed");
                    report.failed.push(name);
                }
            }
        }

        report
    }
}

impl MutationReport {
    fn new(action: &'static str) -> Self {
        Self {
            action,
            applied: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    /// Any failed step becomes a generic 500
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(ApiError::internal_server_error(format!(
                "Failed to complete {}",
                self.action
            )))
        }
    }
}
