// relay-server/src/actors/sweeper_actor.rs
use actix::{Actor, AsyncContext, Context};
use std::sync::Arc;
use std::time::Duration;

use crate::rate_limiter::RateLimiter;
use crate::session_registry::SessionRegistry;

/// How often expired sessions and stale rate-limit windows are collected.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodic garbage collector for the registry and the rate limiter.
pub struct SweeperActor {
    registry: Arc<SessionRegistry>,
    limiter: Arc<RateLimiter>,
}

impl SweeperActor {
    pub fn new(registry: Arc<SessionRegistry>, limiter: Arc<RateLimiter>) -> Self {
        Self { registry, limiter }
    }
}

impl Actor for SweeperActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            "Expiration sweeper started ({}s interval)",
            SWEEP_INTERVAL.as_secs()
        );

        ctx.run_interval(SWEEP_INTERVAL, |act, _ctx| {
            let removed = act.registry.cleanup_expired();
            if removed > 0 {
                tracing::info!("Swept {} expired sessions", removed);
            }

            let dropped = act.limiter.sweep();
            if dropped > 0 {
                tracing::debug!("Dropped {} stale rate-limit windows", dropped);
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Expiration sweeper stopped");
    }
}
