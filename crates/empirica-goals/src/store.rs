use std::sync::Arc;

use chrono::Utc;
use empirica_core::session_store::SessionStore;
use empirica_vector::EpistemicVector;
use uuid::Uuid;

use crate::error::GoalError;
use crate::record::{
    GoalRecord, GoalScope, Importance, LineageAction, LineageEntry, Subtask, SubtaskStatus,
    SuccessCriterion, SuccessCriterionInput,
};

fn goal_key(goal_id: Uuid) -> String {
    format!("goals/{goal_id}")
}

/// Goals and their subtasks, backed by the session store's `goals/{id}`
/// keyspace. Mutations are append-dominant: lineage entries are pushed, not
/// rewritten, and `epistemic_state` is stamped once at creation and never
/// touched again.
pub struct GoalGraph {
    session_store: Arc<dyn SessionStore>,
}

impl GoalGraph {
    pub fn new(session_store: Arc<dyn SessionStore>) -> Self {
        Self { session_store }
    }

    async fn load(&self, goal_id: Uuid) -> Result<GoalRecord, GoalError> {
        let value = self
            .session_store
            .get(&goal_key(goal_id))
            .await?
            .ok_or(GoalError::GoalNotFound(goal_id))?;
        Ok(serde_json::from_value(value)
            .map_err(empirica_core::session_store::SessionStoreError::from)?)
    }

    async fn save(&self, goal: &GoalRecord) -> Result<(), GoalError> {
        let value = serde_json::to_value(goal).expect("GoalRecord always serializes");
        self.session_store.put(&goal_key(goal.goal_id), value).await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_goal(
        &self,
        session_id: Uuid,
        objective: impl Into<String>,
        scope: GoalScope,
        success_criteria: Vec<SuccessCriterionInput>,
        estimated_complexity: f64,
        creator_ai_id: impl Into<String>,
        current_vector: &EpistemicVector,
    ) -> Result<Uuid, GoalError> {
        let creator_ai_id = creator_ai_id.into();
        let now = Utc::now();
        let goal = GoalRecord {
            goal_id: Uuid::new_v4(),
            session_id,
            ai_id: creator_ai_id.clone(),
            created_at: now,
            objective: objective.into(),
            scope,
            success_criteria: success_criteria
                .into_iter()
                .map(|input| SuccessCriterion {
                    id: Uuid::new_v4(),
                    description: input.description,
                    validation_method: input.validation_method,
                    is_met: false,
                })
                .collect(),
            estimated_complexity,
            subtasks: Vec::new(),
            epistemic_state: current_vector.to_flat().into_iter().collect(),
            lineage: vec![LineageEntry {
                ai_id: creator_ai_id,
                timestamp: now,
                action: LineageAction::Created,
            }],
        };
        let goal_id = goal.goal_id;
        self.save(&goal).await?;
        Ok(goal_id)
    }

    pub async fn add_subtask(
        &self,
        goal_id: Uuid,
        description: impl Into<String>,
        importance: Importance,
        dependencies: Vec<Uuid>,
        estimated_tokens: u32,
    ) -> Result<Uuid, GoalError> {
        let mut goal = self.load(goal_id).await?;
        for dependency in &dependencies {
            if !goal.subtasks.iter().any(|s| s.id == *dependency) {
                return Err(GoalError::UnknownDependency(*dependency));
            }
        }
        let subtask = Subtask {
            id: Uuid::new_v4(),
            description: description.into(),
            importance,
            status: SubtaskStatus::Pending,
            dependencies,
            estimated_tokens,
            completion_evidence: None,
        };
        let subtask_id = subtask.id;
        goal.subtasks.push(subtask);
        self.save(&goal).await?;
        Ok(subtask_id)
    }

    /// Transition a subtask to `in_progress`. Guarded: every dependency
    /// must already be `completed`.
    pub async fn start_subtask(&self, goal_id: Uuid, subtask_id: Uuid) -> Result<(), GoalError> {
        let mut goal = self.load(goal_id).await?;
        let dependencies = {
            let subtask = goal
                .subtasks
                .iter()
                .find(|s| s.id == subtask_id)
                .ok_or(GoalError::SubtaskNotFound(subtask_id))?;
            subtask.dependencies.clone()
        };
        let all_complete = dependencies.iter().all(|dep_id| {
            goal.subtasks
                .iter()
                .any(|s| s.id == *dep_id && s.status == SubtaskStatus::Completed)
        });
        if !all_complete {
            return Err(GoalError::DependenciesIncomplete(subtask_id));
        }
        let subtask = goal
            .subtasks
            .iter_mut()
            .find(|s| s.id == subtask_id)
            .expect("checked above");
        subtask.status = SubtaskStatus::InProgress;
        self.save(&goal).await?;
        Ok(())
    }

    pub async fn complete_subtask(
        &self,
        goal_id: Uuid,
        subtask_id: Uuid,
        evidence: impl Into<String>,
    ) -> Result<(), GoalError> {
        let mut goal = self.load(goal_id).await?;
        let dependencies = {
            let subtask = goal
                .subtasks
                .iter()
                .find(|s| s.id == subtask_id)
                .ok_or(GoalError::SubtaskNotFound(subtask_id))?;
            subtask.dependencies.clone()
        };
        let all_complete = dependencies.iter().all(|dep_id| {
            goal.subtasks
                .iter()
                .any(|s| s.id == *dep_id && s.status == SubtaskStatus::Completed)
        });
        if !all_complete {
            return Err(GoalError::DependenciesIncomplete(subtask_id));
        }
        let subtask = goal
            .subtasks
            .iter_mut()
            .find(|s| s.id == subtask_id)
            .expect("checked above");
        subtask.status = SubtaskStatus::Completed;
        subtask.completion_evidence = Some(evidence.into());
        self.save(&goal).await?;
        Ok(())
    }

    /// Mark a success criterion as met. Not in the spec's short operation
    /// list but required to ever satisfy `mark_complete`'s guard.
    pub async fn mark_criterion_met(
        &self,
        goal_id: Uuid,
        criterion_id: Uuid,
    ) -> Result<(), GoalError> {
        let mut goal = self.load(goal_id).await?;
        let criterion = goal
            .success_criteria
            .iter_mut()
            .find(|c| c.id == criterion_id)
            .ok_or(GoalError::CriterionNotFound(criterion_id))?;
        criterion.is_met = true;
        self.save(&goal).await?;
        Ok(())
    }

    pub async fn discover(
        &self,
        ai_id_filter: Option<&str>,
        scope_filter: Option<GoalScope>,
    ) -> Result<Vec<Uuid>, GoalError> {
        let keys = self.session_store.list_prefix("goals").await?;
        let mut goal_ids = Vec::new();
        for key in keys {
            let Some(id_str) = key.strip_prefix("goals/") else {
                continue;
            };
            let Ok(goal_id) = Uuid::parse_str(id_str) else {
                continue;
            };
            let goal = self.load(goal_id).await?;
            if ai_id_filter.is_some_and(|ai_id| goal.ai_id != ai_id) {
                continue;
            }
            if scope_filter.is_some_and(|scope| goal.scope != scope) {
                continue;
            }
            goal_ids.push(goal_id);
        }
        Ok(goal_ids)
    }

    pub async fn resume(
        &self,
        goal_id: Uuid,
        resuming_ai_id: impl Into<String>,
    ) -> Result<GoalRecord, GoalError> {
        let mut goal = self.load(goal_id).await?;
        goal.lineage.push(LineageEntry {
            ai_id: resuming_ai_id.into(),
            timestamp: Utc::now(),
            action: LineageAction::Resumed,
        });
        self.save(&goal).await?;
        Ok(goal)
    }

    pub async fn mark_complete(
        &self,
        goal_id: Uuid,
        completing_ai_id: impl Into<String>,
    ) -> Result<(), GoalError> {
        let mut goal = self.load(goal_id).await?;
        if goal.is_complete() {
            return Err(GoalError::AlreadyTerminal(goal_id));
        }
        if !goal.all_criteria_met() {
            return Err(GoalError::CriteriaNotMet);
        }
        goal.lineage.push(LineageEntry {
            ai_id: completing_ai_id.into(),
            timestamp: Utc::now(),
            action: LineageAction::Completed,
        });
        self.save(&goal).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use empirica_core::session_store::FileSessionStore;

    fn vector() -> EpistemicVector {
        let components: std::collections::HashMap<String, empirica_vector::VectorComponent> =
            empirica_vector::CANONICAL_NAMES
                .iter()
                .map(|name| {
                    (
                        name.to_string(),
                        empirica_vector::VectorComponent::new(0.5, "seed", false, 0).unwrap(),
                    )
                })
                .collect();
        EpistemicVector::from_parsed(components).unwrap()
    }

    fn graph() -> (GoalGraph, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let session_store = Arc::new(FileSessionStore::new(dir.path()));
        (GoalGraph::new(session_store), dir)
    }

    #[tokio::test]
    async fn create_goal_stamps_epistemic_state_and_lineage() {
        let (graph, _dir) = graph();
        let goal_id = graph
            .create_goal(
                Uuid::new_v4(),
                "ship it",
                GoalScope::Session,
                vec![],
                0.4,
                "agent-a",
                &vector(),
            )
            .await
            .unwrap();
        let goal = graph.load(goal_id).await.unwrap();
        assert_eq!(goal.lineage.len(), 1);
        assert_eq!(goal.lineage[0].action, LineageAction::Created);
        assert_eq!(goal.epistemic_state.len(), 13);
    }

    #[tokio::test]
    async fn add_subtask_rejects_unknown_dependency() {
        let (graph, _dir) = graph();
        let goal_id = graph
            .create_goal(Uuid::new_v4(), "ship it", GoalScope::Session, vec![], 0.4, "agent-a", &vector())
            .await
            .unwrap();
        let err = graph
            .add_subtask(goal_id, "step one", Importance::Medium, vec![Uuid::new_v4()], 100)
            .await
            .unwrap_err();
        assert!(matches!(err, GoalError::UnknownDependency(_)));
    }

    #[tokio::test]
    async fn start_subtask_blocked_by_incomplete_dependency() {
        let (graph, _dir) = graph();
        let goal_id = graph
            .create_goal(Uuid::new_v4(), "ship it", GoalScope::Session, vec![], 0.4, "agent-a", &vector())
            .await
            .unwrap();
        let dep_id = graph
            .add_subtask(goal_id, "step one", Importance::Medium, vec![], 100)
            .await
            .unwrap();
        let subtask_id = graph
            .add_subtask(goal_id, "step two", Importance::Medium, vec![dep_id], 100)
            .await
            .unwrap();
        let err = graph.start_subtask(goal_id, subtask_id).await.unwrap_err();
        assert!(matches!(err, GoalError::DependenciesIncomplete(_)));
    }

    #[tokio::test]
    async fn start_subtask_allowed_once_dependency_completed() {
        let (graph, _dir) = graph();
        let goal_id = graph
            .create_goal(Uuid::new_v4(), "ship it", GoalScope::Session, vec![], 0.4, "agent-a", &vector())
            .await
            .unwrap();
        let dep_id = graph
            .add_subtask(goal_id, "step one", Importance::Medium, vec![], 100)
            .await
            .unwrap();
        let subtask_id = graph
            .add_subtask(goal_id, "step two", Importance::Medium, vec![dep_id], 100)
            .await
            .unwrap();
        graph.complete_subtask(goal_id, dep_id, "done").await.unwrap();
        graph.start_subtask(goal_id, subtask_id).await.unwrap();
        let goal = graph.load(goal_id).await.unwrap();
        let subtask = goal.subtasks.iter().find(|s| s.id == subtask_id).unwrap();
        assert_eq!(subtask.status, SubtaskStatus::InProgress);
    }

    #[tokio::test]
    async fn mark_complete_requires_all_criteria_met() {
        let (graph, _dir) = graph();
        let goal_id = graph
            .create_goal(
                Uuid::new_v4(),
                "ship it",
                GoalScope::Session,
                vec![SuccessCriterionInput {
                    description: "tests pass".into(),
                    validation_method: "ci".into(),
                }],
                0.4,
                "agent-a",
                &vector(),
            )
            .await
            .unwrap();
        let err = graph.mark_complete(goal_id, "agent-a").await.unwrap_err();
        assert!(matches!(err, GoalError::CriteriaNotMet));

        let goal = graph.load(goal_id).await.unwrap();
        let criterion_id = goal.success_criteria[0].id;
        graph.mark_criterion_met(goal_id, criterion_id).await.unwrap();
        graph.mark_complete(goal_id, "agent-a").await.unwrap();
        let goal = graph.load(goal_id).await.unwrap();
        assert!(goal.is_complete());
    }

    #[tokio::test]
    async fn resume_appends_lineage_without_mutating_epistemic_state() {
        let (graph, _dir) = graph();
        let goal_id = graph
            .create_goal(Uuid::new_v4(), "ship it", GoalScope::Session, vec![], 0.4, "agent-a", &vector())
            .await
            .unwrap();
        let before = graph.load(goal_id).await.unwrap().epistemic_state;
        let resumed = graph.resume(goal_id, "agent-b").await.unwrap();
        assert_eq!(resumed.lineage.len(), 2);
        assert_eq!(resumed.lineage[1].action, LineageAction::Resumed);
        assert_eq!(resumed.lineage[1].ai_id, "agent-b");
        assert_eq!(resumed.epistemic_state, before);
    }

    #[tokio::test]
    async fn discover_filters_by_ai_id_and_scope() {
        let (graph, _dir) = graph();
        graph
            .create_goal(Uuid::new_v4(), "a", GoalScope::Session, vec![], 0.4, "agent-a", &vector())
            .await
            .unwrap();
        graph
            .create_goal(Uuid::new_v4(), "b", GoalScope::ProjectWide, vec![], 0.4, "agent-b", &vector())
            .await
            .unwrap();
        let found = graph.discover(Some("agent-a"), None).await.unwrap();
        assert_eq!(found.len(), 1);
        let found = graph.discover(None, Some(GoalScope::ProjectWide)).await.unwrap();
        assert_eq!(found.len(), 1);
    }
}
