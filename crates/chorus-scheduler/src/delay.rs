//! Jittered per-responder delays and cancellable one-shot timers.

use chorus_core::config::DelayConfig;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::selector::PassKind;

/// Delay before the responder at ordinal `index` starts generating.
///
/// ```text
/// base    = uniform(min, max)                 // range by pass kind
/// base    = max(floor, base * discount)       // only when mentioned
/// stagger = index * min_gap + r * max_gap
/// catchUp = r^2 * catch_up_scale
/// ```
pub fn compute_delay<R: Rng>(
    cfg: &DelayConfig,
    index: usize,
    mentioned: bool,
    pass: PassKind,
    rng: &mut R,
) -> Duration {
    let (min, max) = match pass {
        PassKind::Human => (cfg.human_min_ms, cfg.human_max_ms),
        PassKind::Background => (cfg.background_min_ms, cfg.background_max_ms),
    };
    let (min, max) = (min as f64, max.max(min) as f64);

    let mut base = if max > min {
        rng.gen_range(min..max)
    } else {
        min
    };
    if mentioned {
        base = (base * cfg.mention_discount).max(cfg.mention_floor_ms as f64);
    }

    let r: f64 = rng.gen();
    let stagger = index as f64 * cfg.min_gap_ms as f64 + r * cfg.max_gap_ms as f64;
    let catch_up = r * r * cfg.catch_up_scale_ms as f64;

    Duration::from_millis((base + stagger + catch_up).floor() as u64)
}

/// A cancellable one-shot timed callback.
///
/// Cancelling before the deadline guarantees the callback never runs;
/// cancelling afterwards aborts it at its next await point.
#[derive(Debug)]
pub struct TimerHandle {
    handle: JoinHandle<()>,
}

impl TimerHandle {
    /// Run `callback` once after `delay`.
    pub fn schedule<F>(delay: Duration, callback: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback.await;
        });
        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
