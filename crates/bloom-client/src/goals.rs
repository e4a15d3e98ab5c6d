use std::sync::Arc;

use bloom_core::doc_keys::OWNER_FIELD;
use bloom_core::ids::OwnerId;
use bloom_core::models::Document;
use bloom_core::models::goal::{Goal, GoalEnd, GoalInput};
use bloom_storage::documents::{decode_snapshot, encode};
use bloom_storage::store::{DocumentStore, Query};
use bloom_sync::synchronizer::CollectionSynchronizer;
use jiff::civil::Date;
use jiff::{Timestamp, Zoned};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::SubmitError;

type Clock = Arc<dyn Fn() -> Date + Send + Sync>;

/// Creates goals while keeping at most one of them open-ended per owner.
///
/// A submission closes the owner's most recently created goal (its `to`
/// becomes today) and only then inserts the new open-ended goal. If closing
/// fails nothing is inserted.
pub struct GoalLifecycleManager {
    store: Arc<dyn DocumentStore>,
    sync: Arc<CollectionSynchronizer<Goal>>,
    today: Clock,
}

impl GoalLifecycleManager {
    pub fn new(store: Arc<dyn DocumentStore>, sync: Arc<CollectionSynchronizer<Goal>>) -> Self {
        Self {
            store,
            sync,
            today: Arc::new(|| Zoned::now().date()),
        }
    }

    /// Replace the local calendar used for "today".
    pub fn with_clock(mut self, today: impl Fn() -> Date + Send + Sync + 'static) -> Self {
        self.set_clock(today);
        self
    }

    pub fn set_clock(&mut self, today: impl Fn() -> Date + Send + Sync + 'static) {
        self.today = Arc::new(today);
    }

    /// Validate and store a new goal for `owner`, resolving the goal to close
    /// from authoritative data.
    ///
    /// The synchronized view is only trusted once it follows `owner` and has
    /// a healthy snapshot. Otherwise the owner's goals are read from the store.
    pub async fn submit(
        &self,
        input: &GoalInput,
        owner: Option<&OwnerId>,
    ) -> Result<Goal, SubmitError> {
        let owner = owner.ok_or(SubmitError::Unauthenticated("goal"))?;
        input.validate()?;

        let view = self.sync.current();
        let settled =
            view.owner() == Some(owner) && view.is_loaded() && view.disruption().is_none();
        let current_goals = if settled {
            view.items().to_vec()
        } else {
            debug!(owner = %owner, "goal view not settled, reading goals from the store");
            let raw = self
                .store
                .list(&Query::owned_by(Goal::COLLECTION, owner.clone()))
                .await?;
            decode_snapshot(raw)
        };

        self.submit_goal(input, &current_goals, Some(owner)).await
    }

    /// Validate and store a new goal for `owner`.
    ///
    /// `current_goals` should come from the synchronized view so the goal to
    /// close is resolved from the latest authoritative data.
    pub async fn submit_goal(
        &self,
        input: &GoalInput,
        current_goals: &[Goal],
        owner: Option<&OwnerId>,
    ) -> Result<Goal, SubmitError> {
        let owner = owner.ok_or(SubmitError::Unauthenticated("goal"))?;
        let macros = input.validate()?;
        let today = (self.today)();

        if let Some(previous) = latest_goal(current_goals, owner) {
            let mut close = Map::new();
            close.insert("to".to_string(), Value::String(GoalEnd::On(today).into()));
            close.insert(OWNER_FIELD.to_string(), Value::String(owner.to_string()));

            self.store
                .update(Goal::COLLECTION, &previous.id, close)
                .await
                .inspect_err(|e| {
                    warn!(owner = %owner, goal_id = %previous.id, error = %e, "failed to close previous goal");
                })?;
            info!(owner = %owner, goal_id = %previous.id, to = %today, "previous goal closed");
        }

        let mut goal = Goal::new_active(owner.clone(), macros, today);
        let id = self
            .store
            .insert(Goal::COLLECTION, encode(&goal)?)
            .await
            .inspect_err(|e| warn!(owner = %owner, error = %e, "failed to insert goal"))?;

        // local estimate until the stream delivers the server timestamp
        goal.assign_identity(id, Some(Timestamp::now()));
        info!(owner = %owner, goal_id = %goal.id, from = %today, "goal created");

        self.sync.add_optimistic(goal.clone());
        Ok(goal)
    }
}

/// The owner's most recently created persisted goal, whatever its end date.
/// Equal timestamps are broken by id.
pub fn latest_goal<'a>(goals: &'a [Goal], owner: &OwnerId) -> Option<&'a Goal> {
    goals
        .iter()
        .filter(|goal| &goal.owner_id == owner && !goal.id.is_local())
        .max_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        })
}

/// The goal currently in effect, if any.
pub fn active_goal(goals: &[Goal]) -> Option<&Goal> {
    goals.iter().find(|goal| goal.is_active())
}
