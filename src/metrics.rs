//! Timing statistics for the control loop, reported once at shutdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hdrhistogram::Histogram;
use parking_lot::Mutex;

#[derive(Clone)]
pub struct TimingMetrics {
    // Busy portion of each tick (work, not sleep)
    tick_hist: Arc<Mutex<Histogram<u64>>>,
    // Latency of individual telemetry send calls
    send_hist: Arc<Mutex<Histogram<u64>>>,
    // Variation between consecutive tick periods
    last_period_ns: Arc<AtomicU64>,
    jitter_hist: Arc<Mutex<Histogram<u64>>>,
}

impl TimingMetrics {
    pub fn new() -> Self {
        Self {
            tick_hist: Arc::new(Mutex::new(Histogram::new(3).unwrap())),
            send_hist: Arc::new(Mutex::new(Histogram::new(3).unwrap())),
            last_period_ns: Arc::new(AtomicU64::new(0)),
            jitter_hist: Arc::new(Mutex::new(Histogram::new(3).unwrap())),
        }
    }

    pub fn record_tick(&self, duration: Duration) {
        self.tick_hist.lock().record(duration.as_nanos() as u64).ok();
    }

    pub fn record_send(&self, duration: Duration) {
        self.send_hist.lock().record(duration.as_nanos() as u64).ok();
    }

    // Jitter is the absolute delta between consecutive tick periods.
    pub fn record_period(&self, period: Duration) {
        let period_ns = period.as_nanos() as u64;
        let last = self.last_period_ns.swap(period_ns, Ordering::Relaxed);
        if last > 0 {
            let jitter = period_ns.abs_diff(last);
            self.jitter_hist.lock().record(jitter).ok();
        }
    }

    pub fn report(&self) -> MetricsReport {
        let tick = self.tick_hist.lock();
        let send = self.send_hist.lock();
        let jitter = self.jitter_hist.lock();

        MetricsReport {
            tick_p50: Duration::from_nanos(tick.value_at_quantile(0.5)),
            tick_p99: Duration::from_nanos(tick.value_at_quantile(0.99)),
            tick_max: Duration::from_nanos(tick.max()),
            send_p50: Duration::from_nanos(send.value_at_quantile(0.5)),
            send_p99: Duration::from_nanos(send.value_at_quantile(0.99)),
            jitter_p50: Duration::from_nanos(jitter.value_at_quantile(0.5)),
            jitter_p99: Duration::from_nanos(jitter.value_at_quantile(0.99)),
            ticks_recorded: tick.len(),
        }
    }
}

#[derive(Debug)]
pub struct MetricsReport {
    pub tick_p50: Duration,
    pub tick_p99: Duration,
    pub tick_max: Duration,
    pub send_p50: Duration,
    pub send_p99: Duration,
    pub jitter_p50: Duration,
    pub jitter_p99: Duration,
    pub ticks_recorded: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_reflects_recorded_ticks() {
        let metrics = TimingMetrics::new();
        for _ in 0..100 {
            metrics.record_tick(Duration::from_micros(250));
        }
        let report = metrics.report();
        assert_eq!(report.ticks_recorded, 100);
        assert!(report.tick_p50 >= Duration::from_micros(200));
        assert!(report.tick_max < Duration::from_millis(1));
    }

    #[test]
    fn jitter_needs_two_periods() {
        let metrics = TimingMetrics::new();
        metrics.record_period(Duration::from_millis(10));
        assert_eq!(metrics.report().jitter_p99, Duration::ZERO);

        metrics.record_period(Duration::from_millis(12));
        let report = metrics.report();
        assert!(report.jitter_p99 >= Duration::from_millis(1));
    }
}
