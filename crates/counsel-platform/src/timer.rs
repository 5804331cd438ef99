use async_trait::async_trait;
use gloo_timers::future::TimeoutFuture;

use counsel_core::ports::TimerPort;

/// `setTimeout`-backed sleeps. Works in the browser and under Node.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlooTimer;

#[async_trait(?Send)]
impl TimerPort for GlooTimer {
    async fn sleep(&self, ms: u64) {
        if ms == 0 {
            return;
        }
        TimeoutFuture::new(ms.min(u32::MAX as u64) as u32).await;
    }
}
