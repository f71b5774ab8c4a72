//! PlanGenerator trait definition

use async_trait::async_trait;

use super::{GeneratedPlan, PlanError, UserProfile};

/// Quote used when the service answers with nothing
pub const FALLBACK_QUOTE: &str = "Train hard, stay focused!";

/// Quote used when the service cannot be reached
pub const OFFLINE_QUOTE: &str = "Your strength grows with every workout!";

/// Produces plans and quotes from a language model
///
/// Each call is independent; no conversation state is kept between calls.
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    /// Generate a workout/diet/tips plan for `profile`
    async fn generate_plan(&self, profile: &UserProfile) -> Result<GeneratedPlan, PlanError>;

    /// One short motivational quote; never fails
    async fn generate_quote(&self) -> String;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    /// Mock plan generator for unit tests
    pub struct MockPlanGenerator {
        plans: Mutex<VecDeque<Result<GeneratedPlan, PlanError>>>,
        call_count: AtomicUsize,
        profiles: Mutex<Vec<UserProfile>>,
    }

    impl MockPlanGenerator {
        pub fn new(plans: Vec<Result<GeneratedPlan, PlanError>>) -> Self {
            debug!(plan_count = %plans.len(), "MockPlanGenerator::new: called");
            Self {
                plans: Mutex::new(plans.into()),
                call_count: AtomicUsize::new(0),
                profiles: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Profiles passed to `generate_plan`, in call order
        pub fn profiles(&self) -> Vec<UserProfile> {
            self.profiles.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PlanGenerator for MockPlanGenerator {
        async fn generate_plan(&self, profile: &UserProfile) -> Result<GeneratedPlan, PlanError> {
            debug!("MockPlanGenerator::generate_plan: called");
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.profiles.lock().unwrap().push(profile.clone());
            self.plans
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(PlanError::InvalidResponse("No more mock plans".to_string())))
        }

        async fn generate_quote(&self) -> String {
            FALLBACK_QUOTE.to_string()
        }
    }
}
