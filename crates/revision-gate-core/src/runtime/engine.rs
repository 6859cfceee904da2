// crates/revision-gate-core/src/runtime/engine.rs
// ============================================================================
// Module: Revision Gate Engine
// Description: Orchestrates gate, locator, mutator, and recorder for one run.
// Purpose: Turn a patch batch and a document into a revised document plus audit.
// Dependencies: crate::core, crate::runtime, thiserror, tracing
// ============================================================================

//! ## Overview
//! A run proceeds in fixed stages over a single document snapshot:
//! malformed records are recorded, every question referenced by a valid patch
//! is gated, approved patches are located against the unmodified snapshot,
//! and located patches are applied in document order (paragraph, then
//! offset). Offsets of later patches in the same paragraph are shifted by the
//! net length change of the edits before them.
//!
//! Per-patch failures never stop the run; every record ends with exactly one
//! audit entry. Only audit bookkeeping or time rendering errors are fatal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::info;
use tracing::warn;

use crate::core::AuditEntry;
use crate::core::Document;
use crate::core::DocumentAnchor;
use crate::core::GateConfig;
use crate::core::GateDecision;
use crate::core::GateOutcome;
use crate::core::GateReport;
use crate::core::LocateOutcome;
use crate::core::PatchBatch;
use crate::core::PatchCounts;
use crate::core::PatchId;
use crate::core::PatchSpec;
use crate::core::PatchStatus;
use crate::core::RejectedPatch;
use crate::core::RunContext;
use crate::core::RunStatus;
use crate::core::RunSummary;
use crate::core::SourceRegistry;
use crate::core::TimeError;
use crate::core::TrackedChange;
use crate::core::TrackedChangeCounts;
use crate::runtime::gate::EvidenceGateEvaluator;
use crate::runtime::locator::AnchorLocator;
use crate::runtime::locator::LocateError;
use crate::runtime::locator::resolve_span;
use crate::runtime::mutator::DocumentFormatError;
use crate::runtime::mutator::TrackedChangeMutator;
use crate::runtime::recorder::AuditError;
use crate::runtime::recorder::AuditRecorder;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Run-fatal engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Run timestamp could not be rendered for revision markup.
    #[error("run timestamp error: {0}")]
    Time(#[from] TimeError),
    /// Audit trail bookkeeping failed.
    #[error(transparent)]
    Audit(#[from] AuditError),
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RevisionOutcome {
    /// Revised document.
    pub document: Document,
    /// Gate decisions for every question referenced by a valid patch.
    pub gate_report: GateReport,
    /// One audit entry per input record.
    pub audit: AuditRecorder,
    /// Tracked changes written, in application order.
    pub changes: Vec<TrackedChange>,
    /// Closing summary.
    pub summary: RunSummary,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Runs patch batches against documents.
#[derive(Debug, Clone, Default)]
pub struct RevisionEngine {
    /// Gate evaluator shared by every question.
    evaluator: EvidenceGateEvaluator,
}

impl RevisionEngine {
    /// Creates an engine with a specific gate evaluator.
    #[must_use]
    pub const fn new(evaluator: EvidenceGateEvaluator) -> Self {
        Self {
            evaluator,
        }
    }

    /// Gates every question referenced by the batch's valid patches.
    #[must_use]
    pub fn gate(
        &self,
        batch: &PatchBatch,
        gate_config: &GateConfig,
        registry: &SourceRegistry,
    ) -> GateReport {
        self.evaluator.evaluate_all(
            batch.patches.iter().map(|patch| &patch.question_id),
            gate_config,
            registry,
        )
    }

    /// Executes one run.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the run timestamp cannot be rendered or
    /// the audit trail rejects an entry. Per-patch failures are recorded, not
    /// returned.
    pub fn run(
        &self,
        context: &RunContext,
        document: Document,
        batch: &PatchBatch,
        gate_config: &GateConfig,
        registry: &SourceRegistry,
    ) -> Result<RevisionOutcome, EngineError> {
        let mut document = document;
        let mut audit = AuditRecorder::new();
        let mut counts = PatchCounts {
            total: batch.record_count(),
            ..PatchCounts::default()
        };

        for rejected in &batch.rejected {
            warn!(patch_id = %rejected.patch_id, "patch malformed");
            audit.record(malformed_entry(rejected))?;
            counts.malformed += 1;
        }

        let gate_report = self.gate(batch, gate_config, registry);
        let mut approved = Vec::new();
        for patch in &batch.patches {
            match gate_report.decision(&patch.question_id) {
                Some(decision) if decision.passed() => approved.push((patch, decision)),
                decision => {
                    warn!(
                        patch_id = %patch.patch_id,
                        question_id = %patch.question_id,
                        "patch blocked by evidence gate"
                    );
                    let detail = decision.map_or_else(String::new, render_reasons);
                    audit.record(
                        EntryDraft::new(patch, decision)
                            .status(PatchStatus::GateFailed, detail)
                            .finish(),
                    )?;
                    counts.gate_failed += 1;
                }
            }
        }

        let mut located = Vec::new();
        {
            let locator = AnchorLocator::new(&document);
            for (patch, decision) in approved {
                match locator.locate(patch) {
                    Ok(LocateOutcome::Located(anchor)) => located.push((patch, decision, anchor)),
                    Ok(LocateOutcome::AlreadyApplied {
                        paragraph_index,
                    }) => {
                        info!(patch_id = %patch.patch_id, paragraph_index, "patch already applied");
                        let mut draft = EntryDraft::new(patch, Some(decision)).status(
                            PatchStatus::AlreadyApplied,
                            format!(
                                "tracked change already present in paragraph {paragraph_index}"
                            ),
                        );
                        draft.entry.after_text = patch.replacement.clone();
                        draft.entry.paragraph_index = Some(paragraph_index);
                        audit.record(draft.finish())?;
                        counts.already_applied += 1;
                    }
                    Err(err) => {
                        warn!(patch_id = %patch.patch_id, error = %err, "patch not located");
                        audit.record(
                            EntryDraft::new(patch, Some(decision))
                                .status(locate_status(&err), err.to_string())
                                .finish(),
                        )?;
                        counts.not_located += 1;
                    }
                }
            }
        }

        located.sort_by_key(|(patch, _, anchor)| {
            (anchor.paragraph_index, anchor.text_start, patch.position)
        });
        let mutator = TrackedChangeMutator::new(context, &batch.footnote_sources)?;
        let mut applied_spans: BTreeMap<usize, Vec<AppliedSpan>> = BTreeMap::new();
        let mut changes = Vec::new();
        for (patch, decision, anchor) in located {
            let spans = applied_spans.entry(anchor.paragraph_index).or_default();
            match apply_located(&mutator, &mut document, patch, &anchor, spans) {
                Ok(change) => {
                    info!(
                        patch_id = %patch.patch_id,
                        question_id = %patch.question_id,
                        paragraph_index = anchor.paragraph_index,
                        change_id = change.change_id,
                        "patch applied"
                    );
                    spans.push(AppliedSpan {
                        patch_id: patch.patch_id.clone(),
                        start: anchor.text_start,
                        end: anchor.text_end,
                        inserted: patch.replacement.chars().count(),
                    });
                    let mut change_ids = vec![change.change_id];
                    change_ids.extend(change.insertion_id);
                    let mut draft = EntryDraft::new(patch, Some(decision)).status(
                        PatchStatus::Applied,
                        format!("tracked change written in paragraph {}", anchor.paragraph_index),
                    );
                    draft.entry.after_text = patch.replacement.clone();
                    draft.entry.change_ids = change_ids;
                    draft.entry.paragraph_index = Some(anchor.paragraph_index);
                    audit.record(draft.finish())?;
                    counts.applied += 1;
                    changes.push(change);
                }
                Err(failure) => {
                    warn!(patch_id = %patch.patch_id, error = %failure, "patch not applied");
                    let status = match failure {
                        ApplyFailure::Locate(ref err) => locate_status(err),
                        ApplyFailure::Format(_) => PatchStatus::DocumentFormat,
                    };
                    let mut draft =
                        EntryDraft::new(patch, Some(decision)).status(status, failure.to_string());
                    draft.entry.paragraph_index = Some(anchor.paragraph_index);
                    audit.record(draft.finish())?;
                    counts.not_located += 1;
                }
            }
        }

        let status =
            if counts.applied > 0 { RunStatus::Completed } else { RunStatus::CompletedNoRevisions };
        let baseline = document.baseline_changes;
        let final_changes = TrackedChangeCounts {
            insertions: baseline.insertions
                + changes.iter().filter(|change| change.insertion_id.is_some()).count(),
            deletions: baseline.deletions + changes.len(),
        };
        let summary = RunSummary {
            context: context.clone(),
            status,
            patches: counts,
            questions_total: gate_report.decisions.len(),
            questions_passed: gate_report.passed_count(),
            baseline_changes: baseline,
            final_changes,
            footnotes_added: document.footnotes.appended().len(),
        };
        info!(
            run_id = %context.run_id,
            status = status.as_str(),
            total = counts.total,
            applied = counts.applied,
            gate_failed = counts.gate_failed,
            malformed = counts.malformed,
            "revision run finished"
        );
        Ok(RevisionOutcome {
            document,
            gate_report,
            audit,
            changes,
            summary,
        })
    }
}

// ============================================================================
// SECTION: Application
// ============================================================================

/// Span already edited in this run, in snapshot offsets.
#[derive(Debug, Clone)]
struct AppliedSpan {
    /// Patch that edited the span.
    patch_id: PatchId,
    /// Snapshot start offset.
    start: usize,
    /// Snapshot end offset.
    end: usize,
    /// Characters inserted in place of the span.
    inserted: usize,
}

/// Why a located patch was not applied.
#[derive(Debug, Error)]
enum ApplyFailure {
    /// Span collides with an earlier edit.
    #[error(transparent)]
    Locate(LocateError),
    /// Span cannot be edited.
    #[error(transparent)]
    Format(DocumentFormatError),
}

/// Shifts a snapshot anchor past earlier edits and applies it.
fn apply_located(
    mutator: &TrackedChangeMutator<'_>,
    document: &mut Document,
    patch: &PatchSpec,
    anchor: &DocumentAnchor,
    applied: &[AppliedSpan],
) -> Result<TrackedChange, ApplyFailure> {
    if let Some(earlier) =
        applied.iter().find(|span| anchor.text_start < span.end && span.start < anchor.text_end)
    {
        return Err(ApplyFailure::Locate(LocateError::AnchorOverlap {
            other: earlier.patch_id.clone(),
        }));
    }
    let (added, removed) = applied
        .iter()
        .filter(|span| span.end <= anchor.text_start)
        .fold((0, 0), |(added, removed), span| {
            (added + span.inserted, removed + (span.end - span.start))
        });
    let start = anchor.text_start + added - removed;
    let end = anchor.text_end + added - removed;
    let shifted = resolve_span(document, anchor.paragraph_index, start, end).ok_or_else(|| {
        ApplyFailure::Format(DocumentFormatError::new(
            anchor.paragraph_index,
            "anchor span no longer resolves",
        ))
    })?;
    mutator.apply(document, patch, &shifted).map_err(ApplyFailure::Format)
}

/// Maps a locate error to its audit status.
const fn locate_status(err: &LocateError) -> PatchStatus {
    match err {
        LocateError::AnchorNotFound {
            ..
        } => PatchStatus::AnchorNotFound,
        LocateError::AnchorAmbiguous {
            ..
        } => PatchStatus::AnchorAmbiguous,
        LocateError::AnchorOverlap {
            ..
        } => PatchStatus::AnchorOverlap,
    }
}

// ============================================================================
// SECTION: Audit Entries
// ============================================================================

/// Audit entry under construction for a valid patch.
struct EntryDraft {
    /// Entry being built.
    entry: AuditEntry,
}

impl EntryDraft {
    /// Starts an unapplied entry with `after_text` equal to the anchor.
    fn new(patch: &PatchSpec, decision: Option<&GateDecision>) -> Self {
        Self {
            entry: AuditEntry {
                patch_id: patch.patch_id.clone(),
                position: patch.position,
                question_id: Some(patch.question_id.clone()),
                gate_outcome: Some(decision.map_or(GateOutcome::Fail, |decision| decision.outcome)),
                status: PatchStatus::GateFailed,
                applied: false,
                reason: patch.reason.clone(),
                detail: String::new(),
                source_refs: patch.source_refs.clone(),
                consulted_sources: decision.map(GateDecision::declared_sources).unwrap_or_default(),
                before_text: patch.anchor.clone(),
                after_text: patch.anchor.clone(),
                change_ids: Vec::new(),
                paragraph_index: None,
            },
        }
    }

    /// Sets the disposition.
    fn status(mut self, status: PatchStatus, detail: impl Into<String>) -> Self {
        self.entry.status = status;
        self.entry.applied = status.is_applied();
        self.entry.detail = detail.into();
        self
    }

    /// Returns the finished entry.
    fn finish(self) -> AuditEntry {
        self.entry
    }
}

/// Entry for a record that failed validation.
fn malformed_entry(rejected: &RejectedPatch) -> AuditEntry {
    AuditEntry {
        patch_id: rejected.patch_id.clone(),
        position: rejected.error.position,
        question_id: rejected.question_id.clone(),
        gate_outcome: None,
        status: PatchStatus::Malformed,
        applied: false,
        reason: rejected.reason.clone(),
        detail: rejected.error.to_string(),
        source_refs: rejected.source_refs.clone(),
        consulted_sources: Vec::new(),
        before_text: rejected.anchor.clone(),
        after_text: rejected.anchor.clone(),
        change_ids: Vec::new(),
        paragraph_index: None,
    }
}

/// Renders a decision's failure reasons.
fn render_reasons(decision: &GateDecision) -> String {
    decision.reasons.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}
