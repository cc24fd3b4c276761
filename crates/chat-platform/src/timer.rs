//! Browser timer: `setTimeout` backed sleeps and `Date.now()`.

use async_trait::async_trait;
use gloo_timers::future::TimeoutFuture;

use chat_core::ports::TimerPort;

pub struct BrowserTimer;

impl BrowserTimer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BrowserTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl TimerPort for BrowserTimer {
    async fn sleep(&self, ms: u64) {
        // setTimeout takes a 32-bit delay
        TimeoutFuture::new(ms.min(u32::MAX as u64) as u32).await;
    }

    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }
}
