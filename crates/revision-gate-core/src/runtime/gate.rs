// crates/revision-gate-core/src/runtime/gate.rs
// ============================================================================
// Module: Revision Gate Evidence Gate Evaluator
// Description: Pure per-question admissibility decisions over a source snapshot.
// Purpose: Fail closed unless every required source is present with adequate evidence.
// Dependencies: crate::core, tracing
// ============================================================================

//! ## Overview
//! The evaluator applies an ordered list of [`GateRule`] variants to a
//! question's declaration. Every rule runs (no short-circuit) so that the
//! decision lists all reasons a question was blocked. A question with no
//! declaration, or with an empty required set, always fails.
//! Source roles come from the declaration's lists; the registry contributes
//! existence and fulltext availability.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::ClaimClass;
use crate::core::DEFAULT_GATE_RULES;
use crate::core::FulltextScope;
use crate::core::GateConfig;
use crate::core::GateDecision;
use crate::core::GateFailureReason;
use crate::core::GateOutcome;
use crate::core::GateReport;
use crate::core::GateRule;
use crate::core::QuestionGate;
use crate::core::QuestionId;
use crate::core::SourceId;
use crate::core::SourceRegistry;

// ============================================================================
// SECTION: Evaluator
// ============================================================================

/// Evaluates question gates against a source registry snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceGateEvaluator {
    /// Rules applied in order.
    rules: Vec<GateRule>,
}

impl Default for EvidenceGateEvaluator {
    fn default() -> Self {
        Self {
            rules: DEFAULT_GATE_RULES.to_vec(),
        }
    }
}

impl EvidenceGateEvaluator {
    /// Creates an evaluator with an explicit rule list.
    ///
    /// [`GateRule::RequiredSetNonEmpty`] and [`GateRule::RequiredSourcesPresent`]
    /// are always enforced, even when the list omits them.
    #[must_use]
    pub fn new(rules: Vec<GateRule>) -> Self {
        let mut rules = rules;
        if !rules.contains(&GateRule::RequiredSourcesPresent) {
            rules.insert(0, GateRule::RequiredSourcesPresent);
        }
        if !rules.contains(&GateRule::RequiredSetNonEmpty) {
            rules.insert(0, GateRule::RequiredSetNonEmpty);
        }
        Self {
            rules,
        }
    }

    /// Creates the default evaluator with a chosen fulltext scope.
    #[must_use]
    pub fn with_fulltext_scope(scope: FulltextScope) -> Self {
        Self::new(vec![
            GateRule::RequiredSetNonEmpty,
            GateRule::RequiredSourcesPresent,
            GateRule::FulltextRequired {
                scope,
            },
        ])
    }

    /// Rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[GateRule] {
        &self.rules
    }

    /// Decides one question.
    #[must_use]
    pub fn evaluate(
        &self,
        question_id: &QuestionId,
        gate: Option<&QuestionGate>,
        registry: &SourceRegistry,
    ) -> GateDecision {
        let Some(gate) = gate else {
            debug!(question_id = %question_id, "question has no gate declaration");
            return GateDecision {
                question_id: question_id.clone(),
                outcome: GateOutcome::Fail,
                claim: ClaimClass::Core,
                required_sources: Vec::new(),
                optional_sources: Vec::new(),
                missing_required: Vec::new(),
                abstract_only: Vec::new(),
                reasons: vec![GateFailureReason::QuestionNotDeclared],
            };
        };

        let mut missing_required = Vec::new();
        let mut abstract_only = Vec::new();
        for source_id in &gate.required_sources {
            match registry.get(source_id) {
                None => push_unique(&mut missing_required, source_id),
                Some(record) if !record.fulltext_available => {
                    push_unique(&mut abstract_only, source_id);
                }
                Some(_) => {}
            }
        }

        let mut reasons = Vec::new();
        for rule in &self.rules {
            apply_rule(*rule, gate, &missing_required, &abstract_only, &mut reasons);
        }

        let outcome = if reasons.is_empty() { GateOutcome::Pass } else { GateOutcome::Fail };
        debug!(
            question_id = %question_id,
            outcome = outcome.as_str(),
            missing = missing_required.len(),
            abstract_only = abstract_only.len(),
            "gate evaluated"
        );
        GateDecision {
            question_id: question_id.clone(),
            outcome,
            claim: gate.claim,
            required_sources: gate.required_sources.clone(),
            optional_sources: gate.optional_sources.clone(),
            missing_required,
            abstract_only,
            reasons,
        }
    }

    /// Decides every listed question.
    #[must_use]
    pub fn evaluate_all<'a>(
        &self,
        questions: impl IntoIterator<Item = &'a QuestionId>,
        config: &GateConfig,
        registry: &SourceRegistry,
    ) -> GateReport {
        let mut decisions = BTreeMap::new();
        for question_id in questions {
            if decisions.contains_key(question_id) {
                continue;
            }
            let decision = self.evaluate(question_id, config.question(question_id), registry);
            decisions.insert(question_id.clone(), decision);
        }
        GateReport {
            rules: self.rules.clone(),
            decisions,
        }
    }
}

// ============================================================================
// SECTION: Rule Dispatch
// ============================================================================

/// Appends the failure reasons one rule produces.
fn apply_rule(
    rule: GateRule,
    gate: &QuestionGate,
    missing_required: &[SourceId],
    abstract_only: &[SourceId],
    reasons: &mut Vec<GateFailureReason>,
) {
    match rule {
        GateRule::RequiredSetNonEmpty => {
            if gate.required_sources.is_empty() {
                reasons.push(GateFailureReason::EmptyRequiredSet);
            }
        }
        GateRule::RequiredSourcesPresent => {
            for source_id in missing_required {
                reasons.push(GateFailureReason::RequiredSourceMissing {
                    source_id: source_id.clone(),
                });
            }
        }
        GateRule::FulltextRequired {
            scope,
        } => {
            let applies = match scope {
                FulltextScope::CoreClaims => gate.claim == ClaimClass::Core,
                FulltextScope::AllClaims => true,
            };
            if applies {
                for source_id in abstract_only {
                    reasons.push(GateFailureReason::AbstractOnlyForClaim {
                        source_id: source_id.clone(),
                        claim: gate.claim,
                    });
                }
            }
        }
    }
}

/// Pushes an id if it is not already listed.
fn push_unique(list: &mut Vec<SourceId>, id: &SourceId) {
    if !list.contains(id) {
        list.push(id.clone());
    }
}
