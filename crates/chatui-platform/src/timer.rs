use gloo_timers::future::TimeoutFuture;
use chatui_core::ports::{Sleep, TimerPort};

/// `setTimeout`-backed timer
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserTimer;

impl TimerPort for BrowserTimer {
    fn sleep(&self, ms: u32) -> Sleep {
        Box::pin(TimeoutFuture::new(ms))
    }
}
