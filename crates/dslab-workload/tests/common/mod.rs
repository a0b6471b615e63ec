#![allow(dead_code)]

use dslab_workload::job::ModelJob;
use dslab_workload::signal::SignalKind;
use dslab_workload::time_signal::TimeSignal;

pub fn assert_float_eq(x: f64, y: f64, eps: f64) {
    assert!(x > y - eps && x < y + eps, "{} != {}", x, y);
}

/// Signal with samples at 0, 1, 2, ...
pub fn signal(kind: SignalKind, values: &[f64]) -> TimeSignal {
    let xvalues = (0..values.len()).map(|i| i as f64).collect();
    TimeSignal::from_values(kind.name(), xvalues, values.to_vec(), None, None).unwrap()
}

/// Job carrying all metrics: zero signals except the listed ones.
pub fn job(time_start: f64, signals: &[(SignalKind, &[f64])]) -> ModelJob {
    let mut job = ModelJob::new(time_start, None, None);
    for kind in SignalKind::ALL.iter() {
        job.set_signal(signal(*kind, &[0.]));
    }
    for (kind, values) in signals.iter() {
        job.set_signal(signal(*kind, values));
    }
    job
}
