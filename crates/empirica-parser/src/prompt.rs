use empirica_vector::CANONICAL_NAMES;

/// One-line definitions for each of the 13 components, in `CANONICAL_NAMES`
/// order, injected into the prompt so the LM knows what it is scoring.
const COMPONENT_DEFINITIONS: [&str; 13] = [
    "engagement: is the agent actively committing to this task?",
    "foundation_know: domain knowledge relevant to the task",
    "foundation_do: execution capability for the task",
    "foundation_context: situational sufficiency — enough context to proceed",
    "comprehension_clarity: clarity of the request",
    "comprehension_coherence: internal consistency of the request and the agent's understanding",
    "comprehension_signal: quality of the evidence available",
    "comprehension_density: information richness (excessive density is undesirable)",
    "execution_state: task progression so far",
    "execution_change: rate of knowledge change during this phase",
    "execution_completion: clarity of the path to the goal",
    "execution_impact: quality of the output produced",
    "uncertainty: the agent's residual doubt",
];

/// Framing for a bound persona, injected as a one-paragraph note in the
/// prompt.
#[derive(Debug, Clone)]
pub struct PersonaFraming {
    pub display_name: String,
    pub focus_domains: Vec<String>,
    pub thresholds_summary: String,
}

/// Everything the prompt needs beyond the fixed component catalogue.
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub phase: &'a str,
    pub round: u32,
    pub task_description: &'a str,
    pub persona: Option<&'a PersonaFraming>,
    /// A short digest of the previous round's gaps, used during INVESTIGATE.
    pub previous_round_summary: Option<&'a str>,
}

/// Build the self-assessment prompt for a single cascade phase.
pub fn build_prompt(ctx: &PromptContext) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!(
        "You are performing a structured self-assessment during phase {} (round {}) of the task:\n\"{}\"\n\n",
        ctx.phase, ctx.round, ctx.task_description
    ));

    prompt.push_str("Score each of the following 13 components honestly, from genuine reasoning about this specific task. Do not use keyword matching or any other heuristic shortcut to produce these scores.\n\n");
    for definition in &COMPONENT_DEFINITIONS {
        prompt.push_str("- ");
        prompt.push_str(definition);
        prompt.push('\n');
    }

    if let Some(persona) = ctx.persona {
        prompt.push_str(&format!(
            "\nYou are assessing as \"{}\". Focus domains: {}. Critical thresholds: {}.\n",
            persona.display_name,
            persona.focus_domains.join(", "),
            persona.thresholds_summary
        ));
    }

    if let Some(summary) = ctx.previous_round_summary {
        prompt.push_str(&format!(
            "\nPrevious investigation round left these gaps: {summary}\n"
        ));
    }

    prompt.push_str(&format!(
        "\nReply with a single JSON object nested by tier, with exactly these top-level keys: engagement, foundation, comprehension, execution, uncertainty. Under foundation: know, do, context. Under comprehension: clarity, coherence, signal, density. Under execution: state, change, completion, impact. Each leaf must be an object: {{\"score\": <0..1>, \"rationale\": \"<non-empty>\", \"evidence\": \"<optional>\", \"warrants_investigation\": <bool>, \"investigation_priority\": <0..10>}}. All {} components are required.\n",
        CANONICAL_NAMES.len()
    ));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_mentions_all_components() {
        let ctx = PromptContext {
            phase: "PREFLIGHT",
            round: 0,
            task_description: "Add unit tests for auth module",
            persona: None,
            previous_round_summary: None,
        };
        let prompt = build_prompt(&ctx);
        for name in CANONICAL_NAMES {
            // bare conceptual suffix (e.g. "know" for "foundation_know") or
            // the prefixed name itself must appear somewhere.
            let bare = name.rsplit('_').next().unwrap();
            assert!(
                prompt.contains(name) || prompt.contains(bare),
                "prompt missing reference to {name}"
            );
        }
    }

    #[test]
    fn prompt_includes_persona_framing_when_bound() {
        let persona = PersonaFraming {
            display_name: "Security Reviewer".into(),
            focus_domains: vec!["auth".into(), "crypto".into()],
            thresholds_summary: "coherence >= 0.5".into(),
        };
        let ctx = PromptContext {
            phase: "PREFLIGHT",
            round: 0,
            task_description: "task",
            persona: Some(&persona),
            previous_round_summary: None,
        };
        let prompt = build_prompt(&ctx);
        assert!(prompt.contains("Security Reviewer"));
        assert!(prompt.contains("auth"));
    }

    #[test]
    fn prompt_forbids_heuristic_scoring() {
        let ctx = PromptContext {
            phase: "CHECK",
            round: 2,
            task_description: "task",
            persona: None,
            previous_round_summary: None,
        };
        let prompt = build_prompt(&ctx);
        assert!(prompt.to_lowercase().contains("keyword"));
    }
}
