use std::sync::Arc;

use bloom_auth::provider::Session;
use bloom_core::filter::FilterCriteria;
use bloom_core::ids::OwnerId;
use bloom_core::models::goal::{Goal, GoalInput};
use bloom_core::models::recipe::{Recipe, RecipeDraft, placeholder_recipes};
use bloom_storage::store::DocumentStore;
use bloom_sync::synchronizer::CollectionSynchronizer;
use bloom_sync::view::SyncedCollection;
use jiff::civil::Date;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::SubmitError;
use crate::goals::{self, GoalLifecycleManager};
use crate::recipes::RecipeLifecycleManager;

/// Entry point for a signed-in (or signed-out) client.
///
/// Follows the session channel and keeps the goal and recipe views scoped to
/// whoever is signed in. Must be created inside a tokio runtime.
pub struct BloomClient {
    sessions: watch::Receiver<Option<Session>>,
    goal_sync: Arc<CollectionSynchronizer<Goal>>,
    recipe_sync: Arc<CollectionSynchronizer<Recipe>>,
    goals: GoalLifecycleManager,
    recipes: RecipeLifecycleManager,
    follower: JoinHandle<()>,
}

impl BloomClient {
    pub fn new(store: Arc<dyn DocumentStore>, sessions: watch::Receiver<Option<Session>>) -> Self {
        let goal_sync = Arc::new(CollectionSynchronizer::<Goal>::new(store.clone()));
        let recipe_sync = Arc::new(
            CollectionSynchronizer::<Recipe>::new(store.clone()).with_fallback(placeholder_recipes()),
        );

        let follower = tokio::spawn(follow_session(
            sessions.clone(),
            goal_sync.clone(),
            recipe_sync.clone(),
        ));

        Self {
            sessions,
            goals: GoalLifecycleManager::new(store.clone(), goal_sync.clone()),
            recipes: RecipeLifecycleManager::new(store, recipe_sync.clone()),
            goal_sync,
            recipe_sync,
            follower,
        }
    }

    /// Replace the local calendar used to date goal submissions.
    pub fn with_clock(mut self, today: impl Fn() -> Date + Send + Sync + 'static) -> Self {
        self.goals.set_clock(today);
        self
    }

    pub fn owner(&self) -> Option<OwnerId> {
        self.sessions.borrow().as_ref().map(|s| s.owner.clone())
    }

    pub fn goals(&self) -> watch::Receiver<SyncedCollection<Goal>> {
        self.goal_sync.view()
    }

    pub fn recipes(&self) -> watch::Receiver<SyncedCollection<Recipe>> {
        self.recipe_sync.view()
    }

    pub fn active_goal(&self) -> Option<Goal> {
        goals::active_goal(self.goal_sync.current().items()).cloned()
    }

    pub fn visible_recipes(&self, criteria: &FilterCriteria) -> Vec<Recipe> {
        self.recipes.visible(criteria)
    }

    pub async fn submit_goal(&self, input: &GoalInput) -> Result<Goal, SubmitError> {
        let owner = self.owner();
        self.goals.submit(input, owner.as_ref()).await
    }

    pub async fn submit_recipe(&self, draft: RecipeDraft) -> Result<Recipe, SubmitError> {
        let owner = self.owner();
        self.recipes.submit_recipe(draft, owner.as_ref()).await
    }
}

impl Drop for BloomClient {
    fn drop(&mut self) {
        self.follower.abort();
        self.goal_sync.teardown();
        self.recipe_sync.teardown();
    }
}

async fn follow_session(
    mut sessions: watch::Receiver<Option<Session>>,
    goal_sync: Arc<CollectionSynchronizer<Goal>>,
    recipe_sync: Arc<CollectionSynchronizer<Recipe>>,
) {
    let mut followed: Option<Option<OwnerId>> = None;

    loop {
        let owner = sessions
            .borrow_and_update()
            .as_ref()
            .map(|s| s.owner.clone());

        if followed.as_ref() != Some(&owner) {
            match &owner {
                Some(owner) => info!(owner = %owner, "following signed-in owner"),
                None => info!("signed out, clearing collections"),
            }
            goal_sync.subscribe(owner.clone());
            recipe_sync.subscribe(owner.clone());
            followed = Some(owner);
        }

        if sessions.changed().await.is_err() {
            break;
        }
    }
}
