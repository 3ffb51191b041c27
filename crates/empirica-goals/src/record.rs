use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalScope {
    SingleTask,
    Session,
    ProjectWide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineageAction {
    Created,
    Resumed,
    Completed,
    Escalated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageEntry {
    pub ai_id: String,
    pub timestamp: DateTime<Utc>,
    pub action: LineageAction,
}

/// Input shape for a success criterion, supplied by the caller at
/// `create_goal` time; the store assigns `id` and `is_met = false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessCriterionInput {
    pub description: String,
    pub validation_method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessCriterion {
    pub id: Uuid,
    pub description: String,
    pub validation_method: String,
    pub is_met: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtaskStatus {
    Pending,
    InProgress,
    Completed,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: Uuid,
    pub description: String,
    pub importance: Importance,
    pub status: SubtaskStatus,
    pub dependencies: Vec<Uuid>,
    pub estimated_tokens: u32,
    pub completion_evidence: Option<String>,
}

/// A goal record: objective, success criteria, subtasks, an immutable
/// epistemic-state snapshot taken at creation, and an append-only lineage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalRecord {
    pub goal_id: Uuid,
    pub session_id: Uuid,
    pub ai_id: String,
    pub created_at: DateTime<Utc>,
    pub objective: String,
    pub scope: GoalScope,
    pub success_criteria: Vec<SuccessCriterion>,
    pub estimated_complexity: f64,
    pub subtasks: Vec<Subtask>,
    pub epistemic_state: BTreeMap<String, f64>,
    pub lineage: Vec<LineageEntry>,
}

impl GoalRecord {
    pub fn is_complete(&self) -> bool {
        self.lineage
            .last()
            .is_some_and(|entry| entry.action == LineageAction::Completed)
    }

    pub fn all_criteria_met(&self) -> bool {
        !self.success_criteria.is_empty() && self.success_criteria.iter().all(|c| c.is_met)
    }
}
