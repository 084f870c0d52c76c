//! Per-tenant request throttling
//!
//! Every tenant-scoped method spends cost units from the tenant's sliding
//! window. Slot search walks every participant's calendar, so it costs more
//! than a plain lookup.

use crate::error::to_rpc_error;
use crate::server::methods;
use hireloop_core::application::{RateLimitDecision, WeightedRateLimiter};
use hireloop_core::error::AppError;
use jsonrpsee::types::ErrorObjectOwned;
use tracing::debug;

pub const SUGGEST_COST: u64 = 5;
pub const SCHEDULE_COST: u64 = 2;
pub const DEFAULT_COST: u64 = 1;

/// Cost units a method spends
pub fn cost_of(method: &str) -> u64 {
    match method {
        methods::SLOTS_SUGGEST => SUGGEST_COST,
        methods::INTERVIEW_SCHEDULE | methods::INTERVIEW_RESCHEDULE => SCHEDULE_COST,
        _ => DEFAULT_COST,
    }
}

pub fn tenant_key(tenant_id: &str) -> String {
    format!("tenant:{}", tenant_id)
}

pub struct RateLimitGuard {
    limiter: WeightedRateLimiter,
}

impl RateLimitGuard {
    pub fn new(limiter: WeightedRateLimiter) -> Self {
        Self { limiter }
    }

    /// Spend the method's cost for a tenant; a denial becomes a THROTTLED error
    pub async fn admit(&self, tenant_id: &str, method: &str) -> Result<(), ErrorObjectOwned> {
        let cost = cost_of(method);
        let decision: RateLimitDecision = self.limiter.check(&tenant_key(tenant_id), cost).await;

        if decision.allowed {
            return Ok(());
        }

        debug!(
            tenant_id = %tenant_id,
            method = %method,
            cost,
            retry_after_ms = decision.retry_after_ms,
            "Request throttled"
        );
        Err(to_rpc_error(AppError::RateLimited {
            retry_after_ms: decision.retry_after_ms,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::code;
    use hireloop_core::application::RateLimitConfig;
    use hireloop_core::port::time_provider::mocks::FixedTimeProvider;
    use hireloop_core::port::InMemoryCounterStore;
    use std::sync::Arc;

    const NOW: i64 = 1_704_067_200_000;

    fn guard(limit: u64) -> (RateLimitGuard, Arc<FixedTimeProvider>) {
        let clock = Arc::new(FixedTimeProvider::new(NOW));
        let store = Arc::new(InMemoryCounterStore::new(clock.clone()));
        let limiter = WeightedRateLimiter::new(
            store,
            clock.clone(),
            RateLimitConfig {
                limit,
                window_ms: 60_000,
            },
        );
        (RateLimitGuard::new(limiter), clock)
    }

    #[test]
    fn test_method_costs() {
        assert_eq!(cost_of("slots.suggest.v1"), 5);
        assert_eq!(cost_of("interview.schedule.v1"), 2);
        assert_eq!(cost_of("interview.reschedule.v1"), 2);
        assert_eq!(cost_of("interview.get.v1"), 1);
        assert_eq!(cost_of("user.list.v1"), 1);
    }

    #[tokio::test]
    async fn test_suggest_exhausts_budget_faster() {
        let (guard, _) = guard(10);

        assert!(guard.admit("acme", "slots.suggest.v1").await.is_ok());
        assert!(guard.admit("acme", "slots.suggest.v1").await.is_ok());

        let err = guard.admit("acme", "slots.suggest.v1").await.unwrap_err();
        assert_eq!(err.code(), code::THROTTLED);
        assert!(err.data().is_some());
    }

    #[tokio::test]
    async fn test_tenants_have_separate_budgets() {
        let (guard, _) = guard(2);

        assert!(guard.admit("acme", "interview.schedule.v1").await.is_ok());
        assert!(guard.admit("acme", "interview.get.v1").await.is_err());
        assert!(guard.admit("globex", "interview.schedule.v1").await.is_ok());
    }

    #[tokio::test]
    async fn test_budget_recovers_after_windows_pass() {
        let (guard, clock) = guard(1);

        assert!(guard.admit("acme", "user.list.v1").await.is_ok());
        assert!(guard.admit("acme", "user.list.v1").await.is_err());

        clock.advance(120_000);
        assert!(guard.admit("acme", "user.list.v1").await.is_ok());
    }
}
