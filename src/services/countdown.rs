//! Synchronized pre-race countdown, re-architected from a per-frame loop into
//! a periodic timer task independent of any rendering cadence.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, interval};
use tracing::debug;

use crate::dto::event::OutboundEvent;
use crate::state::events::EventHub;

/// Run one countdown, broadcasting phase events until `duration` elapses.
///
/// Every `tick` the remaining time is re-read; whenever the displayed value
/// (`ceil(remaining)` in whole seconds) changes, a
/// [`OutboundEvent::CountdownPhase`] is broadcast. The stand-up cue
/// ([`OutboundEvent::CountdownCue`]) fires exactly once, on the first tick
/// where the ceiling of the remaining time equals 2.
///
/// Returns `true` exactly once when the countdown ran to completion. When
/// `cancel` flips, the task stops broadcasting and returns `false`; the caller
/// must then not start the race. A countdown either completes or is
/// cancelled; there are no retries.
pub async fn run(
    duration: Duration,
    tick: Duration,
    events: &EventHub,
    mut cancel: watch::Receiver<bool>,
) -> bool {
    assert!(!duration.is_zero(), "countdown duration must be positive");
    assert!(!tick.is_zero(), "countdown tick must be positive");

    if *cancel.borrow() {
        return false;
    }

    let started = Instant::now();
    let mut ticker = interval(tick);
    let mut announced = None;
    let mut cue_fired = false;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let remaining = duration.saturating_sub(started.elapsed());
                if remaining.is_zero() {
                    return true;
                }

                let seconds = ceil_seconds(remaining);
                if announced != Some(seconds) {
                    events.broadcast(OutboundEvent::CountdownPhase {
                        seconds_remaining: seconds,
                    });
                    announced = Some(seconds);
                }

                if seconds == 2 && !cue_fired {
                    events.broadcast(OutboundEvent::CountdownCue);
                    cue_fired = true;
                }
            }
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    debug!("countdown cancelled");
                    return false;
                }
            }
        }
    }
}

/// Whole seconds left, rounded up (the value a countdown display shows).
fn ceil_seconds(remaining: Duration) -> u64 {
    let whole = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        whole + 1
    } else {
        whole
    }
}
