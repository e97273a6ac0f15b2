//! Background expiry of idle sessions.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info};

use crate::main_lib::AppState;

/// Starts the idle-session sweep. The first sweep runs one `every` after start.
pub fn start_session_sweeper(state: Arc<AppState>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Session sweeper started ({}s interval)", every.as_secs());

        let mut sweep_interval = interval(every);
        sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately.
        sweep_interval.tick().await;

        loop {
            sweep_interval.tick().await;
            run_sweep(&state);
        }
    })
}

fn run_sweep(state: &AppState) {
    let evicted = state.sessions.evict_idle();
    if evicted > 0 {
        info!(
            "Expired {} idle session(s), {} remaining",
            evicted,
            state.sessions.len()
        );
    } else {
        debug!("No idle sessions to expire");
    }
}
