use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::SimParams;

// Everything the loop, the receiver, and the front-end exchange. One lock,
// copy-in/copy-out, nothing blocking or slow while holding it.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<Mutex<StateInner>>,
}

#[derive(Debug, Clone, Copy)]
struct StateInner {
    params: SimParams,
    setpoint: f64,
    true_value: f64,
    noisy_value: f64,
    outlier_active: bool,
}

/// Copy of the full state handed to the front-end for display.
#[derive(Debug, Clone, Copy)]
pub struct StateSnapshot {
    pub params: SimParams,
    pub setpoint: f64,
    pub true_value: f64,
    pub noisy_value: f64,
    pub outlier_active: bool,
}

impl SharedState {
    pub fn new(params: SimParams) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StateInner {
                params,
                setpoint: 0.0,
                true_value: 0.0,
                noisy_value: 0.0,
                outlier_active: false,
            })),
        }
    }

    // Wholesale parameter push from the front-end. Last writer wins.
    pub fn update_params(&self, params: SimParams) {
        self.inner.lock().params = params;
    }

    pub fn params(&self) -> SimParams {
        self.inner.lock().params
    }

    // The tunables plus the current setpoint in one critical section, taken
    // at the top of each tick.
    pub fn control_inputs(&self) -> (SimParams, f64) {
        let inner = self.inner.lock();
        (inner.params, inner.setpoint)
    }

    pub fn set_setpoint(&self, setpoint: f64) {
        self.inner.lock().setpoint = setpoint;
    }

    pub fn setpoint(&self) -> f64 {
        self.inner.lock().setpoint
    }

    // Loop results for this tick.
    pub fn publish(&self, true_value: f64, noisy_value: f64, outlier_active: bool) {
        let mut inner = self.inner.lock();
        inner.true_value = true_value;
        inner.noisy_value = noisy_value;
        inner.outlier_active = outlier_active;
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let inner = self.inner.lock();
        StateSnapshot {
            params: inner.params,
            setpoint: inner.setpoint,
            true_value: inner.true_value,
            noisy_value: inner.noisy_value,
            outlier_active: inner.outlier_active,
        }
    }
}

// Bounded in-memory feed of observations for the front-end to drain into the
// logger. Oldest entries fall off when full.
#[derive(Clone)]
pub struct EventLog {
    entries: Arc<RwLock<VecDeque<String>>>,
    max_size: usize,
}

impl EventLog {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(max_size))),
            max_size,
        }
    }

    pub fn push(&self, message: String) {
        let mut entries = self.entries.write();
        entries.push_back(message);
        if entries.len() > self.max_size {
            entries.pop_front();
        }
    }

    pub fn drain(&self) -> Vec<String> {
        self.entries.write().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_inputs_see_the_latest_push() {
        let state = SharedState::new(SimParams::default());
        state.set_setpoint(2.5);

        let params = SimParams {
            kp: 9.0,
            ..SimParams::default()
        };
        state.update_params(params);

        let (got_params, setpoint) = state.control_inputs();
        assert_eq!(got_params.kp, 9.0);
        assert_eq!(setpoint, 2.5);
    }

    #[test]
    fn publish_shows_up_in_the_snapshot() {
        let state = SharedState::new(SimParams::default());
        state.publish(1.0, 1.4, true);

        let snap = state.snapshot();
        assert_eq!(snap.true_value, 1.0);
        assert_eq!(snap.noisy_value, 1.4);
        assert!(snap.outlier_active);
    }

    #[test]
    fn event_log_evicts_oldest_when_full() {
        let log = EventLog::new(3);
        for i in 0..5 {
            log.push(format!("event {i}"));
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.drain(), vec!["event 2", "event 3", "event 4"]);
        assert!(log.is_empty());
    }
}
