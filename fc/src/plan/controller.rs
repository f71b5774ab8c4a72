//! Plan controller
//!
//! Owns the current plan, its phase, and its persisted snapshot. Unlike the
//! image side, failures here are returned to the caller for display, and a
//! failed generation never disturbs the plan the user already has.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use planstore::SnapshotStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{GeneratedPlan, PlanError, PlanGenerator, UserProfile};

/// Store key the plan snapshot lives under
pub const PLAN_KEY: &str = "fitness-plan";

/// A plan together with the profile it was generated for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    #[serde(alias = "user")]
    pub profile: UserProfile,

    #[serde(flatten)]
    pub plan: GeneratedPlan,

    /// Absent in snapshots written before timestamps were recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

/// Where the plan request currently stands
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlanPhase {
    #[default]
    Idle,
    Requesting,
    Done,
    Failed { message: String },
}

pub struct PlanController {
    generator: Arc<dyn PlanGenerator>,
    store: SnapshotStore,
    current: Option<PlanSnapshot>,
    phase: PlanPhase,
    loaded_from_store: bool,
}

impl PlanController {
    /// Create a controller, restoring the last saved plan if there is one
    ///
    /// An unreadable store is logged and treated as empty.
    pub fn open(generator: Arc<dyn PlanGenerator>, store: SnapshotStore) -> Self {
        debug!(path = %store.path().display(), "PlanController::open: called");
        let current = match store.load::<PlanSnapshot>(PLAN_KEY) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Failed to read saved plan, starting empty");
                None
            }
        };
        let loaded_from_store = current.is_some();
        if loaded_from_store {
            info!("Restored saved plan");
        }
        Self {
            generator,
            store,
            current,
            phase: if loaded_from_store { PlanPhase::Done } else { PlanPhase::Idle },
            loaded_from_store,
        }
    }

    pub fn current(&self) -> Option<&PlanSnapshot> {
        self.current.as_ref()
    }

    pub fn phase(&self) -> &PlanPhase {
        &self.phase
    }

    /// Whether the current plan came from disk rather than this session
    pub fn loaded_from_store(&self) -> bool {
        self.loaded_from_store
    }

    /// Generate a plan for `profile` and persist it
    ///
    /// On failure the phase records the message and the previous plan is
    /// left as it was.
    pub async fn generate(&mut self, profile: UserProfile) -> Result<&PlanSnapshot, PlanError> {
        debug!(name = %profile.name, "PlanController::generate: called");
        if let Err(e) = profile.validate() {
            self.phase = PlanPhase::Failed { message: e.to_string() };
            return Err(e);
        }

        self.phase = PlanPhase::Requesting;
        let plan = match self.generator.generate_plan(&profile).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "Plan generation failed");
                self.phase = PlanPhase::Failed { message: e.to_string() };
                return Err(e);
            }
        };

        let snapshot = PlanSnapshot {
            profile,
            plan,
            saved_at: Some(Utc::now()),
        };
        // The new plan is shown even if it cannot be saved
        if let Err(e) = self.store.save(PLAN_KEY, &snapshot) {
            warn!(error = %e, "Failed to save plan snapshot");
        }
        info!("Plan ready");
        self.phase = PlanPhase::Done;
        self.loaded_from_store = false;
        Ok(self.current.insert(snapshot))
    }

    /// Generate again for the current profile
    pub async fn regenerate(&mut self) -> Result<&PlanSnapshot, PlanError> {
        debug!("PlanController::regenerate: called");
        let profile = self.current.as_ref().map(|s| s.profile.clone()).ok_or(PlanError::NoProfile)?;
        self.generate(profile).await
    }

    /// Forget the current plan, in memory and on disk
    pub fn clear(&mut self) -> Result<(), PlanError> {
        debug!("PlanController::clear: called");
        self.store
            .clear(PLAN_KEY)
            .map_err(|e| PlanError::Store(e.to_string()))?;
        self.current = None;
        self.phase = PlanPhase::Idle;
        self.loaded_from_store = false;
        Ok(())
    }

    pub async fn quote(&self) -> String {
        self.generator.generate_quote().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::generator::mock::MockPlanGenerator;
    use serde_json::json;
    use tempfile::TempDir;

    fn plan(tag: &str) -> GeneratedPlan {
        GeneratedPlan {
            workout: format!("{} workout", tag),
            diet: format!("{} diet", tag),
            tips: format!("{} tips", tag),
        }
    }

    fn open(temp_dir: &TempDir, generator: &Arc<MockPlanGenerator>) -> PlanController {
        let store = SnapshotStore::open(temp_dir.path()).unwrap();
        PlanController::open(generator.clone(), store)
    }

    #[tokio::test]
    async fn test_generate_saves_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let generator = Arc::new(MockPlanGenerator::new(vec![Ok(plan("first"))]));
        let mut controller = open(&temp_dir, &generator);
        assert_eq!(controller.phase(), &PlanPhase::Idle);

        let snapshot = controller.generate(UserProfile::named("Asha")).await.unwrap();
        assert_eq!(snapshot.plan.workout, "first workout");
        assert!(snapshot.saved_at.is_some());
        assert_eq!(controller.phase(), &PlanPhase::Done);
        assert!(!controller.loaded_from_store());

        let reopened = open(&temp_dir, &generator);
        assert!(reopened.loaded_from_store());
        assert_eq!(reopened.current().unwrap().profile.name, "Asha");
        assert_eq!(reopened.current().unwrap().plan, plan("first"));
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_plan() {
        let temp_dir = TempDir::new().unwrap();
        let generator = Arc::new(MockPlanGenerator::new(vec![
            Ok(plan("first")),
            Err(PlanError::Api {
                status: 400,
                message: "API key not valid.".to_string(),
            }),
        ]));
        let mut controller = open(&temp_dir, &generator);
        controller.generate(UserProfile::named("Asha")).await.unwrap();

        let err = controller.regenerate().await.unwrap_err();
        assert!(err.to_string().contains("API key not valid."));
        assert!(matches!(controller.phase(), PlanPhase::Failed { message } if message.contains("API key")));
        assert_eq!(controller.current().unwrap().plan, plan("first"));

        let reopened = open(&temp_dir, &generator);
        assert_eq!(reopened.current().unwrap().plan, plan("first"));
    }

    #[tokio::test]
    async fn test_regenerate_reuses_profile() {
        let temp_dir = TempDir::new().unwrap();
        let generator = Arc::new(MockPlanGenerator::new(vec![Ok(plan("first")), Ok(plan("second"))]));
        let mut controller = open(&temp_dir, &generator);
        let profile = UserProfile {
            stress: Some("High".to_string()),
            ..UserProfile::named("Asha")
        };
        controller.generate(profile.clone()).await.unwrap();

        let snapshot = controller.regenerate().await.unwrap();
        assert_eq!(snapshot.plan, plan("second"));
        assert_eq!(generator.profiles(), vec![profile.clone(), profile]);
    }

    #[tokio::test]
    async fn test_regenerate_without_profile() {
        let temp_dir = TempDir::new().unwrap();
        let generator = Arc::new(MockPlanGenerator::new(vec![]));
        let mut controller = open(&temp_dir, &generator);

        assert!(matches!(controller.regenerate().await, Err(PlanError::NoProfile)));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_profile_is_not_sent() {
        let temp_dir = TempDir::new().unwrap();
        let generator = Arc::new(MockPlanGenerator::new(vec![Ok(plan("first"))]));
        let mut controller = open(&temp_dir, &generator);

        let err = controller.generate(UserProfile::named("")).await.unwrap_err();
        assert!(matches!(err, PlanError::InvalidProfile(_)));
        assert_eq!(generator.call_count(), 0);
        assert!(controller.current().is_none());
    }

    #[tokio::test]
    async fn test_clear_removes_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let generator = Arc::new(MockPlanGenerator::new(vec![Ok(plan("first"))]));
        let mut controller = open(&temp_dir, &generator);
        controller.generate(UserProfile::named("Asha")).await.unwrap();

        controller.clear().unwrap();
        assert!(controller.current().is_none());
        assert_eq!(controller.phase(), &PlanPhase::Idle);
        assert!(open(&temp_dir, &generator).current().is_none());
    }

    #[test]
    fn test_reads_legacy_snapshot_shape() {
        let snapshot: PlanSnapshot = serde_json::from_value(json!({
            "user": {
                "name": "Asha", "age": 30, "gender": "Female", "heightCm": 165, "weightKg": 60,
                "goal": "Endurance", "level": "Advanced", "location": "Outdoor", "diet": "Vegan",
                "medical": "", "stress": ""
            },
            "workout": "w", "diet": "d", "tips": "t"
        }))
        .unwrap();
        assert_eq!(snapshot.profile.age, 30);
        assert_eq!(snapshot.plan.diet, "d");
        assert!(snapshot.saved_at.is_none());
        assert_eq!(snapshot.profile.medical_or_default(), "None");
    }
}
