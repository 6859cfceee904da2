// crates/revision-gate-core/src/core/gate.rs
// ============================================================================
// Module: Revision Gate Evidence Gate Model
// Description: Per-question gate declarations, rule variants, and decisions.
// Purpose: Describe what evidence each sub-question needs before it may be revised.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! A [`GateConfig`] maps each question to the sources it must (and may) cite
//! and to the class of claim the question revises. The evaluator turns that
//! declaration plus the source registry into a [`GateDecision`]. Rules form a
//! closed set ([`GateRule`]) so that the audit can name exactly which rule
//! blocked a question.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::QuestionId;
use crate::core::identifiers::SourceId;

// ============================================================================
// SECTION: Gate Declarations
// ============================================================================

/// Kind of claim a question's revisions touch.
///
/// Abstract-level evidence is acceptable only for supporting claims. A
/// question that does not declare its class is treated as [`ClaimClass::Core`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimClass {
    /// Central claim; required sources need fulltext.
    #[default]
    Core,
    /// Supporting claim; abstracts suffice.
    Supporting,
}

impl ClaimClass {
    /// Stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Supporting => "supporting",
        }
    }
}

/// Evidence declaration for one question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuestionGate {
    /// Sources that must be present (and fulltext for core claims).
    #[serde(default)]
    pub required_sources: Vec<SourceId>,
    /// Sources that may be consulted but never decide the outcome.
    #[serde(default)]
    pub optional_sources: Vec<SourceId>,
    /// Claim classification.
    #[serde(default)]
    pub claim: ClaimClass,
}

/// Gate declarations keyed by question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GateConfig {
    /// Declarations by question id.
    pub questions: BTreeMap<QuestionId, QuestionGate>,
}

impl GateConfig {
    /// Returns the declaration for a question, if any.
    #[must_use]
    pub fn question(&self, question_id: &QuestionId) -> Option<&QuestionGate> {
        self.questions.get(question_id)
    }
}

// ============================================================================
// SECTION: Rules
// ============================================================================

/// Which claims the fulltext rule applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulltextScope {
    /// Only [`ClaimClass::Core`] questions need fulltext.
    #[default]
    CoreClaims,
    /// Every question needs fulltext.
    AllClaims,
}

/// Closed set of gate rules, evaluated in order by a single dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum GateRule {
    /// The question must declare at least one required source.
    RequiredSetNonEmpty,
    /// Every required source must resolve in the registry.
    RequiredSourcesPresent,
    /// Required sources must have fulltext for claims in scope.
    FulltextRequired {
        /// Claims the rule applies to.
        scope: FulltextScope,
    },
}

/// Default rule set used by the evaluator.
pub const DEFAULT_GATE_RULES: [GateRule; 3] = [
    GateRule::RequiredSetNonEmpty,
    GateRule::RequiredSourcesPresent,
    GateRule::FulltextRequired {
        scope: FulltextScope::CoreClaims,
    },
];

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Gate outcome for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    /// Revisions to the question are admissible.
    Pass,
    /// Revisions to the question are blocked.
    Fail,
}

impl GateOutcome {
    /// Stable lowercase label used in tabular artifacts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }
}

/// Why a gate failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum GateFailureReason {
    /// No gate declaration exists for the question.
    QuestionNotDeclared,
    /// The question declares no required sources.
    EmptyRequiredSet,
    /// A required source is not in the registry.
    RequiredSourceMissing {
        /// Missing source.
        source_id: SourceId,
    },
    /// A required source only has abstract-level evidence.
    AbstractOnlyForClaim {
        /// Abstract-only source.
        source_id: SourceId,
        /// Claim class that needed fulltext.
        claim: ClaimClass,
    },
}

impl fmt::Display for GateFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuestionNotDeclared => f.write_str("question has no gate declaration"),
            Self::EmptyRequiredSet => f.write_str("required source set is empty"),
            Self::RequiredSourceMissing {
                source_id,
            } => write!(f, "required source {source_id} is missing"),
            Self::AbstractOnlyForClaim {
                source_id,
                claim,
            } => write!(
                f,
                "required source {source_id} is abstract-only for a {} claim",
                claim.as_str()
            ),
        }
    }
}

/// Result of gating one question.
///
/// # Invariants
/// - `outcome` is `Fail` iff `reasons` is non-empty.
/// - Deterministic for a given declaration, rule set, and registry snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    /// Question evaluated.
    pub question_id: QuestionId,
    /// Pass or fail.
    pub outcome: GateOutcome,
    /// Claim class the decision was made under.
    pub claim: ClaimClass,
    /// Required sources declared for the question.
    pub required_sources: Vec<SourceId>,
    /// Optional sources declared for the question.
    pub optional_sources: Vec<SourceId>,
    /// Required sources absent from the registry.
    pub missing_required: Vec<SourceId>,
    /// Required sources present with abstract-only evidence.
    pub abstract_only: Vec<SourceId>,
    /// Failure reasons in rule order.
    pub reasons: Vec<GateFailureReason>,
}

impl GateDecision {
    /// Returns true when the question passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome == GateOutcome::Pass
    }

    /// Every source declared for the question, required first.
    #[must_use]
    pub fn declared_sources(&self) -> Vec<SourceId> {
        let mut out = self.required_sources.clone();
        for id in &self.optional_sources {
            if !out.contains(id) {
                out.push(id.clone());
            }
        }
        out
    }
}

/// Gate decisions for every question touched by a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateReport {
    /// Rules the decisions were made under.
    pub rules: Vec<GateRule>,
    /// Decisions keyed by question.
    pub decisions: BTreeMap<QuestionId, GateDecision>,
}

impl GateReport {
    /// Returns the decision for a question, if it was evaluated.
    #[must_use]
    pub fn decision(&self, question_id: &QuestionId) -> Option<&GateDecision> {
        self.decisions.get(question_id)
    }

    /// Number of questions that passed.
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.decisions.values().filter(|decision| decision.passed()).count()
    }
}
