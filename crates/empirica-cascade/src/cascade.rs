use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use empirica_checkpoint::{CheckpointRecord, CheckpointStore, Phase};
use empirica_core::llm_transport::LlmTransport;
use empirica_core::ContentHash;
use empirica_identity::eep1::SignedPayload;
use empirica_identity::keypair::IdentityKeyPair;
use empirica_parser::prompt::{build_prompt, PersonaFraming, PromptContext};
use empirica_parser::reply::parse_reply;
use empirica_parser::ParserError;
use empirica_persona::{blend_priors, blend_strength, PersonaProfile};
use empirica_vector::{Action, ComponentBound, EpistemicVector, TierWeights, VectorComponent};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::CascadeError;
use crate::state::PhaseTransitionRecord;

/// A cooperative cancellation flag, consulted at phase boundaries only (the
/// in-flight LM call and checkpoint write are never interrupted mid-phase).
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One INVESTIGATE round's audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationRoundLog {
    pub round: u32,
    pub findings_digest: String,
    pub vector_delta: BTreeMap<String, f64>,
}

/// What a `run_until_act`/`report_act_outcome` call produced: either the
/// cascade is waiting on the caller's acting phase to finish, or it reached
/// one of the five terminal phases.
#[derive(Debug, Clone)]
pub enum CascadeOutcome {
    AwaitingAct {
        checkpoint_id: ContentHash,
    },
    Terminal {
        status: Phase,
        checkpoint_id: ContentHash,
        phase_history: Vec<PhaseTransitionRecord>,
    },
}

enum AssessOutcome {
    Ok(EpistemicVector, Vec<String>),
    Faulted(ParserError),
}

struct ResolvedKnobs {
    engagement_gate: f64,
    confidence_to_proceed: f64,
    max_investigation_rounds: u32,
}

fn resolve_knobs(
    config: &empirica_core::config::CascadeConfig,
    persona: Option<&PersonaProfile>,
) -> (ResolvedKnobs, TierWeights, Vec<ComponentBound>) {
    match persona {
        Some(persona) => {
            let knobs = persona.investigation_profile.knobs();
            (
                ResolvedKnobs {
                    engagement_gate: knobs.engagement_gate,
                    confidence_to_proceed: knobs.confidence_to_proceed,
                    max_investigation_rounds: knobs.max_investigation_rounds,
                },
                persona.tier_weights.into(),
                persona.critical_bounds(),
            )
        }
        None => (
            ResolvedKnobs {
                engagement_gate: config.engagement_gate,
                confidence_to_proceed: config.confidence_to_proceed,
                max_investigation_rounds: config.max_investigation_rounds,
            },
            TierWeights::default(),
            Vec::new(),
        ),
    }
}

fn round_2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn rounded_flat(vector: &EpistemicVector) -> BTreeMap<String, f64> {
    vector.to_flat().into_iter().map(|(k, v)| (k, round_2(v))).collect()
}

/// A neutral placeholder vector used only when a phase faults before any
/// vector could be parsed — every checkpoint carries a 13-entry vectors map
/// by invariant, even the diagnostic one.
fn neutral_vector() -> EpistemicVector {
    let c = || VectorComponent::new(0.5, "unavailable: phase faulted before a vector was parsed", false, 0)
        .expect("0.5/false/0 is always valid");
    EpistemicVector {
        engagement: c(),
        foundation_know: c(),
        foundation_do: c(),
        foundation_context: c(),
        comprehension_clarity: c(),
        comprehension_coherence: c(),
        comprehension_signal: c(),
        comprehension_density: c(),
        execution_state: c(),
        execution_change: c(),
        execution_completion: c(),
        execution_impact: c(),
        uncertainty: c(),
    }
}

fn parser_error_kind(err: &ParserError) -> &'static str {
    match err {
        ParserError::MalformedReply(_) => "MalformedReply",
        ParserError::MissingComponent(_) => "MissingComponent",
        ParserError::OutOfRange(_, _) => "OutOfRange",
        ParserError::InconsistentFlags(_) => "InconsistentFlags",
    }
}

fn componentwise_delta(before: &EpistemicVector, after: &EpistemicVector) -> BTreeMap<String, f64> {
    let before = before.to_flat();
    after
        .to_flat()
        .into_iter()
        .map(|(name, score)| {
            let prior = before.get(&name).copied().unwrap_or(0.0);
            (name, round_2(score - prior))
        })
        .collect()
}

/// Unweighted mean absolute delta on the three Execution components
/// (completion, change, impact — `execution_state` is not part of this
/// formula), clipped to [0,1] and inverted into an accuracy score.
fn calibration_accuracy(baseline: &EpistemicVector, postflight: &EpistemicVector) -> f64 {
    let deltas = [
        (postflight.execution_completion.score - baseline.execution_completion.score).abs(),
        (postflight.execution_change.score - baseline.execution_change.score).abs(),
        (postflight.execution_impact.score - baseline.execution_impact.score).abs(),
    ];
    let mean_abs_delta = deltas.iter().sum::<f64>() / deltas.len() as f64;
    (1.0 - mean_abs_delta).clamp(0.0, 1.0)
}

fn findings_digest(vector: &EpistemicVector) -> String {
    let flagged: Vec<&str> = vector
        .components()
        .into_iter()
        .filter(|(_, c)| c.warrants_investigation)
        .map(|(name, _)| name)
        .collect();
    if flagged.is_empty() {
        "no components flagged for further investigation".to_string()
    } else {
        format!("flagged: {}", flagged.join(", "))
    }
}

fn summarize_thresholds(persona: &PersonaProfile) -> String {
    if persona.critical_thresholds.is_empty() {
        return "none".to_string();
    }
    persona
        .critical_thresholds
        .iter()
        .map(|t| match (t.min, t.max) {
            (Some(min), Some(max)) => format!("{} in [{min:.2}, {max:.2}]", t.component),
            (Some(min), None) => format!("{} >= {min:.2}", t.component),
            (None, Some(max)) => format!("{} <= {max:.2}", t.component),
            (None, None) => format!("{} (unbounded)", t.component),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Sequences PREFLIGHT → (THINK?) → INVESTIGATE* → CHECK → ACT → POSTFLIGHT
/// for one agent in one session. All dependencies are constructor-injected;
/// there is no ambient or process-wide state.
pub struct Cascade {
    llm: Arc<dyn LlmTransport>,
    checkpoints: Arc<CheckpointStore>,
    identity: Option<Arc<IdentityKeyPair>>,
    persona: Option<PersonaProfile>,
    session_id: Uuid,
    ai_id: String,
    model_id: Option<String>,
    knobs: ResolvedKnobs,
    tier_weights: TierWeights,
    thresholds: Vec<ComponentBound>,

    phase: Phase,
    round: u32,
    task_description: String,
    baseline_vector: Option<EpistemicVector>,
    current_vector: Option<EpistemicVector>,
    phase_history: Vec<PhaseTransitionRecord>,
    investigation_log: Vec<InvestigationRoundLog>,
    awaiting_act: bool,
    terminal: Option<Phase>,
}

impl Cascade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        llm: Arc<dyn LlmTransport>,
        checkpoints: Arc<CheckpointStore>,
        session_id: Uuid,
        ai_id: impl Into<String>,
        config: &empirica_core::config::CascadeConfig,
        persona: Option<PersonaProfile>,
        identity: Option<Arc<IdentityKeyPair>>,
        model_id: Option<String>,
    ) -> Self {
        let (knobs, tier_weights, thresholds) = resolve_knobs(config, persona.as_ref());
        Self {
            llm,
            checkpoints,
            identity,
            persona,
            session_id,
            ai_id: ai_id.into(),
            model_id,
            knobs,
            tier_weights,
            thresholds,
            phase: Phase::Preflight,
            round: 0,
            task_description: String::new(),
            baseline_vector: None,
            current_vector: None,
            phase_history: Vec::new(),
            investigation_log: Vec::new(),
            awaiting_act: false,
            terminal: None,
        }
    }

    pub fn phase_history(&self) -> &[PhaseTransitionRecord] {
        &self.phase_history
    }

    pub fn investigation_log(&self) -> &[InvestigationRoundLog] {
        &self.investigation_log
    }

    pub fn current_vector(&self) -> Option<&EpistemicVector> {
        self.current_vector.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    /// Sign the current vector as an EEP-1 payload, if an identity is bound.
    /// Returns `None` when no identity was supplied to the constructor.
    pub fn sign_final(
        &self,
        cascade_trace_hash: ContentHash,
        model_id: impl Into<String>,
        metadata_sources: Vec<String>,
    ) -> Option<SignedPayload> {
        let identity = self.identity.as_ref()?;
        let vector = self.current_vector.as_ref()?;
        Some(empirica_identity::eep1::sign_assessment(
            identity,
            vector.to_flat().into_iter().collect(),
            cascade_trace_hash,
            model_id,
            metadata_sources,
        ))
    }

    fn persona_framing(&self) -> Option<PersonaFraming> {
        self.persona.as_ref().map(|p| PersonaFraming {
            display_name: p.display_name.clone(),
            focus_domains: p.focus_domains.clone(),
            thresholds_summary: summarize_thresholds(p),
        })
    }

    fn record_transition(&mut self, from: Phase, round: u32, action: Option<Action>, to: Phase) {
        tracing::debug!(from = %from, to = %to, round, action = ?action, "cascade phase transition");
        self.phase_history.push(PhaseTransitionRecord { from, round, action, to });
    }

    fn terminal_outcome(&self, status: Phase, checkpoint_id: ContentHash) -> CascadeOutcome {
        CascadeOutcome::Terminal {
            status,
            checkpoint_id,
            phase_history: self.phase_history.clone(),
        }
    }

    /// Ask the LM, parse its reply, retrying once with the identical prompt
    /// on a parser error, then blend persona priors at this phase's
    /// strength. LM-transport errors are not retried; they propagate via
    /// `?` unchanged.
    async fn assess(
        &self,
        phase: Phase,
        round: u32,
        previous_round_summary: Option<&str>,
    ) -> Result<AssessOutcome, CascadeError> {
        let framing = self.persona_framing();
        let phase_str = phase.to_string();
        let ctx = PromptContext {
            phase: &phase_str,
            round,
            task_description: &self.task_description,
            persona: framing.as_ref(),
            previous_round_summary,
        };
        let prompt = build_prompt(&ctx);

        let reply = self.llm.ask(&prompt, self.model_id.as_deref()).await?;
        let parsed = match parse_reply(&reply) {
            Ok(parsed) => parsed,
            Err(_first) => {
                let retry = self.llm.ask(&prompt, self.model_id.as_deref()).await?;
                match parse_reply(&retry) {
                    Ok(parsed) => parsed,
                    Err(second) => return Ok(AssessOutcome::Faulted(second)),
                }
            }
        };

        let vector = match &self.persona {
            Some(persona) => blend_priors(&parsed.vector, persona, blend_strength(&phase_str)),
            None => parsed.vector,
        };

        Ok(AssessOutcome::Ok(vector, parsed.warnings))
    }

    async fn write_checkpoint(
        &self,
        phase: Phase,
        round: u32,
        vector: &EpistemicVector,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> Result<ContentHash, CascadeError> {
        let record = CheckpointRecord {
            session_id: self.session_id,
            ai_id: self.ai_id.clone(),
            phase,
            round,
            timestamp: Utc::now(),
            vectors: rounded_flat(vector),
            metadata,
        };
        Ok(self.checkpoints.append(record).await?)
    }

    async fn write_fault_checkpoint(
        &self,
        phase: Phase,
        round: u32,
        err: &ParserError,
    ) -> Result<ContentHash, CascadeError> {
        let vector = self.current_vector.clone().unwrap_or_else(neutral_vector);
        let mut metadata = BTreeMap::new();
        metadata.insert(
            "error".to_string(),
            json!({
                "kind": parser_error_kind(err),
                "phase": phase.to_string(),
                "round": round,
                "message": err.to_string(),
            }),
        );
        self.write_checkpoint(Phase::Faulted, round, &vector, metadata).await
    }

    async fn write_escalated_checkpoint(&self, round: u32, action: Action) -> Result<ContentHash, CascadeError> {
        let vector = self
            .current_vector
            .clone()
            .expect("current_vector is set before CHECK can terminate");
        let confidence = vector.overall_confidence(self.tier_weights);
        let mut metadata = BTreeMap::new();
        metadata.insert("confidence".to_string(), json!(round_2(confidence)));
        metadata.insert("recommended_action".to_string(), json!(action.to_string()));
        metadata.insert("investigation_count".to_string(), json!(round));
        self.write_checkpoint(Phase::Escalated, round, &vector, metadata).await
    }

    async fn finish_canceled(&mut self) -> Result<CascadeOutcome, CascadeError> {
        let vector = self.current_vector.clone().unwrap_or_else(neutral_vector);
        let checkpoint_id = self.write_checkpoint(Phase::Canceled, self.round, &vector, BTreeMap::new()).await?;
        self.record_transition(self.phase, self.round, None, Phase::Canceled);
        self.terminal = Some(Phase::Canceled);
        Ok(self.terminal_outcome(Phase::Canceled, checkpoint_id))
    }

    /// Drive PREFLIGHT through CHECK and into ACT, or to an earlier terminal
    /// state (BLOCKED, ESCALATED, FAULTED, CANCELED). Returns
    /// `AwaitingAct` once the ACT marker checkpoint has been written; the
    /// caller must then perform the external work and call
    /// `report_act_outcome`.
    pub async fn run_until_act(
        &mut self,
        task_description: impl Into<String>,
        cancel: &CancelToken,
    ) -> Result<CascadeOutcome, CascadeError> {
        if self.terminal.is_some() {
            return Err(CascadeError::AlreadyTerminal);
        }
        self.task_description = task_description.into();

        loop {
            if cancel.is_canceled() {
                return self.finish_canceled().await;
            }
            match self.phase {
                Phase::Preflight => {
                    if let Some(outcome) = self.step_preflight().await? {
                        return Ok(outcome);
                    }
                }
                Phase::Investigate => {
                    if let Some(outcome) = self.step_investigate().await? {
                        return Ok(outcome);
                    }
                }
                Phase::Check => {
                    if let Some(outcome) = self.step_check().await? {
                        return Ok(outcome);
                    }
                }
                Phase::Act => return self.step_act().await,
                other => unreachable!("run_until_act does not drive phase {other}"),
            }
        }
    }

    async fn step_preflight(&mut self) -> Result<Option<CascadeOutcome>, CascadeError> {
        let (vector, warnings) = match self.assess(Phase::Preflight, 0, None).await? {
            AssessOutcome::Faulted(err) => {
                let checkpoint_id = self.write_fault_checkpoint(Phase::Preflight, 0, &err).await?;
                self.record_transition(Phase::Preflight, 0, None, Phase::Faulted);
                self.terminal = Some(Phase::Faulted);
                return Ok(Some(self.terminal_outcome(Phase::Faulted, checkpoint_id)));
            }
            AssessOutcome::Ok(vector, warnings) => (vector, warnings),
        };
        for warning in &warnings {
            tracing::debug!(phase = %Phase::Preflight, warning, "parser warning");
        }

        let action = vector.recommended_action(
            self.tier_weights,
            self.knobs.engagement_gate,
            self.knobs.confidence_to_proceed,
            &self.thresholds,
        );
        let confidence = vector.overall_confidence(self.tier_weights);

        let mut metadata = BTreeMap::new();
        metadata.insert("confidence".to_string(), json!(round_2(confidence)));
        metadata.insert("recommended_action".to_string(), json!(action.to_string()));
        metadata.insert("task".to_string(), json!(self.task_description));
        let checkpoint_id = self.write_checkpoint(Phase::Preflight, 0, &vector, metadata).await?;

        self.baseline_vector = Some(vector.clone());
        self.current_vector = Some(vector);

        match action {
            Action::Block => {
                self.record_transition(Phase::Preflight, 0, Some(action), Phase::Blocked);
                self.terminal = Some(Phase::Blocked);
                Ok(Some(self.terminal_outcome(Phase::Blocked, checkpoint_id)))
            }
            Action::Escalate => {
                self.record_transition(Phase::Preflight, 0, Some(action), Phase::Escalated);
                self.terminal = Some(Phase::Escalated);
                Ok(Some(self.terminal_outcome(Phase::Escalated, checkpoint_id)))
            }
            Action::Investigate => {
                self.round = 1;
                self.record_transition(Phase::Preflight, 0, Some(action), Phase::Investigate);
                self.phase = Phase::Investigate;
                Ok(None)
            }
            Action::Proceed => {
                self.record_transition(Phase::Preflight, 0, Some(action), Phase::Check);
                self.phase = Phase::Check;
                Ok(None)
            }
        }
    }

    async fn step_investigate(&mut self) -> Result<Option<CascadeOutcome>, CascadeError> {
        let round = self.round;
        let previous_summary = self.investigation_log.last().map(|log| log.findings_digest.clone());

        let (vector, warnings) = match self.assess(Phase::Investigate, round, previous_summary.as_deref()).await? {
            AssessOutcome::Faulted(err) => {
                let checkpoint_id = self.write_fault_checkpoint(Phase::Investigate, round, &err).await?;
                self.record_transition(Phase::Investigate, round, None, Phase::Faulted);
                self.terminal = Some(Phase::Faulted);
                return Ok(Some(self.terminal_outcome(Phase::Faulted, checkpoint_id)));
            }
            AssessOutcome::Ok(vector, warnings) => (vector, warnings),
        };
        for warning in &warnings {
            tracing::debug!(phase = %Phase::Investigate, round, warning, "parser warning");
        }

        let action = vector.recommended_action(
            self.tier_weights,
            self.knobs.engagement_gate,
            self.knobs.confidence_to_proceed,
            &self.thresholds,
        );
        let confidence = vector.overall_confidence(self.tier_weights);

        let mut metadata = BTreeMap::new();
        metadata.insert("confidence".to_string(), json!(round_2(confidence)));
        metadata.insert("recommended_action".to_string(), json!(action.to_string()));
        metadata.insert("investigation_count".to_string(), json!(round));
        self.write_checkpoint(Phase::Investigate, round, &vector, metadata).await?;

        let previous_vector = self.current_vector.clone().unwrap_or_else(|| vector.clone());
        self.investigation_log.push(InvestigationRoundLog {
            round,
            findings_digest: findings_digest(&vector),
            vector_delta: componentwise_delta(&previous_vector, &vector),
        });
        self.current_vector = Some(vector);

        let to_phase = if action == Action::Investigate && round < self.knobs.max_investigation_rounds {
            Phase::Investigate
        } else {
            Phase::Check
        };
        self.record_transition(Phase::Investigate, round, Some(action), to_phase);

        if to_phase == Phase::Investigate {
            self.round = round + 1;
        }
        self.phase = to_phase;
        Ok(None)
    }

    async fn step_check(&mut self) -> Result<Option<CascadeOutcome>, CascadeError> {
        let round = self.round;
        let (vector, warnings) = match self.assess(Phase::Check, round, None).await? {
            AssessOutcome::Faulted(err) => {
                let checkpoint_id = self.write_fault_checkpoint(Phase::Check, round, &err).await?;
                self.record_transition(Phase::Check, round, None, Phase::Faulted);
                self.terminal = Some(Phase::Faulted);
                return Ok(Some(self.terminal_outcome(Phase::Faulted, checkpoint_id)));
            }
            AssessOutcome::Ok(vector, warnings) => (vector, warnings),
        };
        for warning in &warnings {
            tracing::debug!(phase = %Phase::Check, round, warning, "parser warning");
        }

        let action = vector.recommended_action(
            self.tier_weights,
            self.knobs.engagement_gate,
            self.knobs.confidence_to_proceed,
            &self.thresholds,
        );
        let confidence = vector.overall_confidence(self.tier_weights);

        let mut metadata = BTreeMap::new();
        metadata.insert("confidence".to_string(), json!(round_2(confidence)));
        metadata.insert("recommended_action".to_string(), json!(action.to_string()));
        self.write_checkpoint(Phase::Check, round, &vector, metadata).await?;
        self.current_vector = Some(vector);

        match action {
            Action::Proceed => {
                self.record_transition(Phase::Check, round, Some(action), Phase::Act);
                self.phase = Phase::Act;
                Ok(None)
            }
            Action::Investigate if round < self.knobs.max_investigation_rounds => {
                self.record_transition(Phase::Check, round, Some(action), Phase::Investigate);
                self.round = round + 1;
                self.phase = Phase::Investigate;
                Ok(None)
            }
            // Per the transition rule, any other outcome at CHECK — a
            // direct ESCALATE, a BLOCK recomputed this late, or an
            // INVESTIGATE that has exhausted its round budget — terminates
            // as ESCALATED, distinctly from PREFLIGHT's own BLOCKED gate.
            _ => {
                let checkpoint_id = self.write_escalated_checkpoint(round, action).await?;
                self.record_transition(Phase::Check, round, Some(action), Phase::Escalated);
                self.terminal = Some(Phase::Escalated);
                Ok(Some(self.terminal_outcome(Phase::Escalated, checkpoint_id)))
            }
        }
    }

    async fn step_act(&mut self) -> Result<CascadeOutcome, CascadeError> {
        let vector = self
            .current_vector
            .clone()
            .expect("current_vector is set before ACT is entered");
        let confidence = vector.overall_confidence(self.tier_weights);
        let mut metadata = BTreeMap::new();
        metadata.insert("confidence".to_string(), json!(round_2(confidence)));
        let checkpoint_id = self.write_checkpoint(Phase::Act, self.round, &vector, metadata).await?;
        self.awaiting_act = true;
        Ok(CascadeOutcome::AwaitingAct { checkpoint_id })
    }

    /// Complete the ACT phase the caller performed externally, then run
    /// POSTFLIGHT and return the COMPLETED terminal outcome (or FAULTED if
    /// POSTFLIGHT's own assessment fails twice).
    pub async fn report_act_outcome(
        &mut self,
        summary: impl Into<String>,
        _artifacts: Vec<String>,
    ) -> Result<CascadeOutcome, CascadeError> {
        if !self.awaiting_act || self.phase != Phase::Act {
            return Err(CascadeError::NotAwaitingAct);
        }
        let summary = summary.into();
        let round = self.round;

        let (vector, warnings) = match self.assess(Phase::Postflight, round, Some(&summary)).await? {
            AssessOutcome::Faulted(err) => {
                let checkpoint_id = self.write_fault_checkpoint(Phase::Postflight, round, &err).await?;
                self.record_transition(Phase::Act, round, None, Phase::Faulted);
                self.terminal = Some(Phase::Faulted);
                self.awaiting_act = false;
                return Ok(self.terminal_outcome(Phase::Faulted, checkpoint_id));
            }
            AssessOutcome::Ok(vector, warnings) => (vector, warnings),
        };
        for warning in &warnings {
            tracing::debug!(phase = %Phase::Postflight, warning, "parser warning");
        }

        let action = vector.recommended_action(
            self.tier_weights,
            self.knobs.engagement_gate,
            self.knobs.confidence_to_proceed,
            &self.thresholds,
        );
        let baseline = self
            .baseline_vector
            .clone()
            .expect("baseline_vector is stamped at PREFLIGHT");
        let delta = componentwise_delta(&baseline, &vector);
        let calibration = calibration_accuracy(&baseline, &vector);
        let confidence = vector.overall_confidence(self.tier_weights);

        let mut metadata = BTreeMap::new();
        metadata.insert("confidence".to_string(), json!(round_2(confidence)));
        metadata.insert("recommended_action".to_string(), json!(action.to_string()));
        metadata.insert("task".to_string(), json!(self.task_description));
        metadata.insert("delta".to_string(), json!(delta));
        metadata.insert("calibration_accuracy".to_string(), json!(round_2(calibration)));
        let checkpoint_id = self.write_checkpoint(Phase::Postflight, round, &vector, metadata).await?;

        self.current_vector = Some(vector);
        self.record_transition(Phase::Act, round, None, Phase::Postflight);
        self.record_transition(Phase::Postflight, round, Some(action), Phase::Completed);
        self.terminal = Some(Phase::Completed);
        self.awaiting_act = false;

        Ok(self.terminal_outcome(Phase::Completed, checkpoint_id))
    }
}
