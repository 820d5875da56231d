//! Stabilization policy: deciding when the page is safe to observe.
//!
//! Navigation lifecycle signals alone are not enough on storefront pages
//! that keep mutating the DOM after "load" fires (lazy-loaded product
//! cards, client-side re-renders), and a fixed sleep is unreliable across
//! network conditions. The policy therefore waits, in order and under one
//! shared deadline, for:
//!
//! 1. DOMContentLoaded (readyState "interactive" or beyond),
//! 2. load (readyState "complete"),
//! 3. a window of DOM quiescence, detected by an in-page MutationObserver
//!    whose quiet-timer resets on every mutation and races an absolute
//!    ceiling timer.
//!
//! Every phase tolerates its own timeout: a page mid-animation is
//! screenshot anyway once the budget runs out. This is a heuristic, not a
//! correctness guarantee.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::cdp::{CdpError, PageSession};

/// How long `wait_until_stable` may block, and how long the DOM must stay
/// quiet to count as settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilizeBudget {
    /// Absolute ceiling across all phases.
    pub max_wait: Duration,
    /// Quiet window with no DOM mutations.
    pub dom_quiet: Duration,
}

impl Default for StabilizeBudget {
    /// Action-triggered stabilization: tuned for snappy interactive steps.
    fn default() -> Self {
        Self {
            max_wait: Duration::from_millis(500),
            dom_quiet: Duration::from_millis(500),
        }
    }
}

impl StabilizeBudget {
    /// Budget for initial page loads and session resets, which are allowed
    /// to take longer than mid-conversation actions.
    pub fn initial() -> Self {
        Self {
            max_wait: Duration::from_millis(1000),
            dom_quiet: Duration::from_millis(500),
        }
    }
}

/// Block until the page looks settled or the budget runs out. Phase
/// timeouts are logged and swallowed; only transport-level failures would
/// surface, and even those are downgraded because stabilization is
/// best-effort by contract.
pub async fn wait_until_stable(session: &PageSession, budget: StabilizeBudget) {
    let deadline = Instant::now() + budget.max_wait;

    // Phase 1: DOMContentLoaded analogue.
    if let Err(e) = wait_ready(session, deadline, false).await {
        debug!("Stabilize: DOMContentLoaded not reached: {}", e);
    }

    // Phase 2: full load.
    if let Err(e) = wait_ready(session, deadline, true).await {
        debug!("Stabilize: load not reached: {}", e);
    }

    // Phase 3: DOM quiescence, skipped entirely with an exhausted budget.
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return;
    }
    if let Err(e) = wait_dom_quiet(session, budget.dom_quiet, remaining).await {
        debug!("Stabilize: DOM quiescence not observed: {}", e);
    }
}

/// Poll `document.readyState` until the page is interactive (or fully
/// complete when `require_complete` is set), bounded by the deadline.
async fn wait_ready(
    session: &PageSession,
    deadline: Instant,
    require_complete: bool,
) -> Result<(), CdpError> {
    loop {
        let state = session.ready_state().await?;
        if state == "complete" || (!require_complete && state == "interactive") {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(CdpError::Timeout(format!(
                "readyState still '{}' at deadline",
                state
            )));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// Wait for a `quiet` window with no DOM mutations, with `ceiling` as the
/// absolute limit. The race runs inside the page; the outer timeout only
/// covers a wedged evaluate call.
async fn wait_dom_quiet(
    session: &PageSession,
    quiet: Duration,
    ceiling: Duration,
) -> Result<(), CdpError> {
    let script = dom_quiet_script(quiet.as_millis() as u64, ceiling.as_millis() as u64);
    let guard = ceiling + quiet + Duration::from_secs(1);

    tokio::time::timeout(guard, session.evaluate(&script))
        .await
        .map_err(|_| CdpError::Timeout("DOM quiescence evaluate wedged".to_string()))??;
    Ok(())
}

/// In-page promise resolving when `quiet_ms` passes with no mutation
/// anywhere in the document, or when `timeout_ms` elapses - whichever
/// comes first.
fn dom_quiet_script(quiet_ms: u64, timeout_ms: u64) -> String {
    format!(
        r#"new Promise((resolve) => {{
            const quietMs = {quiet_ms};
            const timeoutMs = {timeout_ms};
            let done = false;
            let quietTimer;
            const finish = () => {{
                if (done) return;
                done = true;
                observer.disconnect();
                clearTimeout(quietTimer);
                clearTimeout(ceiling);
                resolve(true);
            }};
            const observer = new MutationObserver(() => {{
                clearTimeout(quietTimer);
                quietTimer = setTimeout(finish, quietMs);
            }});
            observer.observe(document, {{
                subtree: true,
                childList: true,
                attributes: true,
                characterData: true,
            }});
            quietTimer = setTimeout(finish, quietMs);
            const ceiling = setTimeout(finish, timeoutMs);
        }})"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget_is_action_sized() {
        let b = StabilizeBudget::default();
        assert_eq!(b.max_wait, Duration::from_millis(500));
        assert_eq!(b.dom_quiet, Duration::from_millis(500));
    }

    #[test]
    fn test_initial_budget_is_larger() {
        let b = StabilizeBudget::initial();
        assert!(b.max_wait > StabilizeBudget::default().max_wait);
    }

    #[test]
    fn test_dom_quiet_script_embeds_timers() {
        let script = dom_quiet_script(500, 1200);
        assert!(script.contains("const quietMs = 500;"));
        assert!(script.contains("const timeoutMs = 1200;"));
        assert!(script.contains("MutationObserver"));
        assert!(script.contains("characterData: true"));
    }

    #[test]
    fn test_deadline_saturates_to_zero() {
        let deadline = Instant::now() - Duration::from_millis(50);
        assert!(deadline.saturating_duration_since(Instant::now()).is_zero());
    }
}
