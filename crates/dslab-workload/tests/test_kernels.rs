mod common;
use common::{assert_float_eq, job};

use std::collections::BTreeMap;

use dslab_workload::error::WorkloadError;
use dslab_workload::kernels::{KernelKind, KernelValue};
use dslab_workload::signal::{SignalKind, SignalRegistry};
use dslab_workload::synthetic_app::SyntheticApp;

#[test]
fn test_read_count_is_at_least_one_when_volume_is_read() {
    let job = job(0., &[(SignalKind::KbRead, &[50.]), (SignalKind::NRead, &[0.])]);
    let frames = KernelKind::FileRead
        .synapp_config(&job, 1, None, &SignalRegistry::new())
        .unwrap();
    assert_eq!(frames.len(), 1);
    assert!(frames[0].value("n_read").unwrap() >= 1.);
    assert_eq!(frames[0].value("kb_read"), Some(50.));
    assert_eq!(frames[0].mmap, Some(false));
    assert!(!frames[0].empty);
}

#[test]
fn test_flops_are_clamped_to_max_value() {
    let registry = SignalRegistry::new();
    let job = job(0., &[(SignalKind::Flops, &[5e12])]);
    let frames = KernelKind::Cpu.synapp_config(&job, 1, None, &registry).unwrap();
    assert_eq!(frames[0].value("flops"), Some(registry.max_value(SignalKind::Flops)));
    assert_eq!(frames[0].values["flops"], KernelValue::Int(1_000_000_000_000));
    assert_eq!(frames[0].mmap, None);
}

#[test]
fn test_configured_hard_limits_apply() {
    let registry = SignalRegistry::with_hard_limits(&BTreeMap::from([(SignalKind::KbWrite, 10.)])).unwrap();
    let job = job(0., &[(SignalKind::KbWrite, &[25.]), (SignalKind::NWrite, &[0.])]);
    let frames = KernelKind::FileWrite.synapp_config(&job, 1, None, &registry).unwrap();
    assert_eq!(frames[0].value("kb_write"), Some(10.));
    assert_eq!(frames[0].value("n_write"), Some(1.));
}

#[test]
fn test_write_volume_is_at_least_one_when_writes_happen() {
    let job = job(0., &[(SignalKind::NWrite, &[3.]), (SignalKind::KbWrite, &[0.])]);
    let frames = KernelKind::FileWrite
        .synapp_config(&job, 1, None, &SignalRegistry::new())
        .unwrap();
    assert_eq!(frames[0].value("kb_write"), Some(1.));
    assert_eq!(frames[0].value("n_write"), Some(3.));
}

#[test]
fn test_mpi_counts_and_output_order() {
    let job = job(
        0.,
        &[
            (SignalKind::KbCollective, &[2e7]),
            (SignalKind::KbPairwise, &[8.]),
            (SignalKind::NPairwise, &[0.]),
        ],
    );
    let registry = SignalRegistry::new();
    let frames = KernelKind::Mpi.synapp_config(&job, 1, None, &registry).unwrap();
    let keys: Vec<&str> = frames[0].values.keys().copied().collect();
    assert_eq!(keys, vec!["n_collective", "kb_collective", "n_pairwise", "kb_pairwise"]);
    assert_eq!(frames[0].value("n_collective"), Some(1.));
    assert_eq!(frames[0].value("kb_collective"), Some(registry.max_value(SignalKind::KbCollective)));
    assert_eq!(frames[0].value("n_pairwise"), Some(1.));
    assert_eq!(frames[0].value("kb_pairwise"), Some(8.));
}

#[test]
fn test_mpi_count_is_raised_for_zero_volume() {
    let job = job(
        0.,
        &[
            (SignalKind::KbCollective, &[0.]),
            (SignalKind::NCollective, &[0.]),
            (SignalKind::KbPairwise, &[8.]),
            (SignalKind::NPairwise, &[2.]),
        ],
    );
    assert!(!KernelKind::Mpi.is_empty(&job).unwrap());
    let frames = KernelKind::Mpi.synapp_config(&job, 1, None, &SignalRegistry::new()).unwrap();
    assert!(!frames[0].empty);
    assert_eq!(frames[0].value("kb_collective"), Some(0.));
    assert_eq!(frames[0].value("n_collective"), Some(1.));
    assert_eq!(frames[0].value("n_pairwise"), Some(2.));
}

#[test]
fn test_stretching_multiplies_values() {
    let job = job(0., &[(SignalKind::Flops, &[10., 20.])]);
    let stretching = BTreeMap::from([(SignalKind::Flops, 2.5)]);
    let frames = KernelKind::Cpu
        .synapp_config(&job, 2, Some(&stretching), &SignalRegistry::new())
        .unwrap();
    assert_eq!(frames[0].value("flops"), Some(25.));
    assert_eq!(frames[1].value("flops"), Some(50.));
}

#[test]
fn test_kernel_emptiness() {
    let job = job(0., &[(SignalKind::Flops, &[1.])]);
    assert!(!KernelKind::Cpu.is_empty(&job).unwrap());
    assert!(KernelKind::Mpi.is_empty(&job).unwrap());
    assert!(KernelKind::FileRead.is_empty(&job).unwrap());

    let mut incomplete = job.clone();
    incomplete.timesignals.insert(SignalKind::NRead, None);
    assert!(matches!(
        KernelKind::FileRead.is_empty(&incomplete),
        Err(WorkloadError::MissingSignal {
            signal: SignalKind::NRead,
            ..
        })
    ));
}

#[test]
fn test_empty_bins_are_dropped_from_frames() {
    let app = SyntheticApp::new("appgen-0", job(0., &[(SignalKind::Flops, &[0., 5., 0.])]));
    let frames = app.frame_data(3, &SignalRegistry::new()).unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].len(), 1);
    assert_eq!(frames[0][0].name, "cpu");
    assert_eq!(frames[0][0].value("flops"), Some(5.));
}

#[test]
fn test_all_zero_app_has_no_frames() {
    let app = SyntheticApp::new("appgen-0", job(0., &[]));
    assert!(app.frame_data(4, &SignalRegistry::new()).unwrap().is_empty());
}

#[test]
fn test_frames_are_bin_major() {
    let app = SyntheticApp::new(
        "appgen-0",
        job(
            0.,
            &[
                (SignalKind::Flops, &[1., 1.]),
                (SignalKind::KbRead, &[0., 4.]),
                (SignalKind::NRead, &[0., 2.]),
            ],
        ),
    );
    let frames = app.frame_data(2, &SignalRegistry::new()).unwrap();
    assert_eq!(frames.len(), 2);
    let names: Vec<Vec<&str>> = frames.iter().map(|bin| bin.iter().map(|f| f.name).collect()).collect();
    assert_eq!(names, vec![vec!["cpu"], vec!["cpu", "file-read"]]);
    assert_float_eq(frames[1][1].value("kb_read").unwrap(), 4., 1e-12);
}

#[test]
fn test_frames_serialize_flat() {
    let job = job(0., &[(SignalKind::KbRead, &[1.5]), (SignalKind::NRead, &[2.])]);
    let frames = KernelKind::FileRead
        .synapp_config(&job, 1, None, &SignalRegistry::new())
        .unwrap();
    let json = serde_json::to_value(&frames[0]).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"name": "file-read", "kb_read": 1.5, "n_read": 2, "mmap": false})
    );
}
