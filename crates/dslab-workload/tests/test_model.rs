mod common;
use common::{assert_float_eq, job, signal};

use std::collections::BTreeMap;

use dslab_workload::config::{ModelConfig, SplitConfig};
use dslab_workload::error::WorkloadError;
use dslab_workload::filling::{fill_missing_entries, match_by_keyword};
use dslab_workload::generation::GenerationStrategyKind;
use dslab_workload::job::{JobAttribute, ModelJob};
use dslab_workload::kprofile::{KProfile, PROFILE_PRIORITY};
use dslab_workload::model::WorkloadModel;
use dslab_workload::signal::{SignalKind, SignalRegistry};
use dslab_workload::synthetic_app::SyntheticApp;
use dslab_workload::synthetic_workload::SyntheticWorkload;
use dslab_workload::workload::WorkloadData;

const CONFIG: &str = r#"
workload_filling:
  - type: fill_missing_entries
    apply_to: [hpc]
    priority: 0
clustering:
  type: kmeans
  apply_to: [hpc]
  rseed: 1
  max_iter: 50
  max_num_clusters: 3
  delta_num_clusters: 1
  num_timesignal_bins: 4
  ok_if_low_rank: true
generator:
  type: match_job_pdf_exact
  strategy: spawn_random
  n_bins_for_pdf: 5
  random_seed: 7
  scaling_factors:
    flops: 2.0
  submit_rate_factor: 1.0
  synthapp_n_cpu: 2
  synthapp_n_nodes: 1
  total_submit_interval: 100.0
"#;

/// Jobs with flops and kb_write only, the other metrics are left for filling.
fn profiled_workload() -> WorkloadData {
    let jobs = (0..6)
        .map(|i| {
            let mut job = ModelJob::new(i as f64 * 10., Some(4), None);
            job.job_name = Some(if i % 2 == 0 { format!("big-{}", i) } else { format!("small-{}", i) });
            let scale = if i % 2 == 0 { 100. } else { 1. };
            job.set_signal(signal(SignalKind::Flops, &[scale, 2. * scale, scale]));
            job.set_signal(signal(SignalKind::KbWrite, &[0., scale / 10.]));
            job
        })
        .collect();
    WorkloadData::new("hpc", jobs)
}

#[test]
fn test_config_defaults() {
    let config = ModelConfig::from_yaml_str(CONFIG).unwrap();
    assert_eq!(config.generator.strategy, GenerationStrategyKind::SpawnRandom);
    assert_eq!(config.generator.global_scaling_factor, 1.);
    assert_eq!(config.clustering.num_clusters, None);
    let factors = config.generator.tuning_factors();
    assert_eq!(factors[&SignalKind::Flops], 2.);
    assert_eq!(factors[&SignalKind::KbRead], 1.);
}

#[test]
fn test_config_rejects_unknown_keys() {
    let yaml = CONFIG.replace("  rseed: 1\n", "  rseed: 1\n  seed: 2\n");
    assert!(matches!(ModelConfig::from_yaml_str(&yaml), Err(WorkloadError::Yaml(_))));
    let yaml = CONFIG.replace("flops: 2.0", "kb_scratch: 2.0");
    assert!(ModelConfig::from_yaml_str(&yaml).is_err());
}

#[test]
fn test_config_validation() {
    let yaml = CONFIG.replace("num_timesignal_bins: 4", "num_timesignal_bins: 0");
    assert!(matches!(ModelConfig::from_yaml_str(&yaml), Err(WorkloadError::Config(_))));
    let yaml = CONFIG.replace("total_submit_interval: 100.0", "total_submit_interval: -1.0");
    assert!(matches!(ModelConfig::from_yaml_str(&yaml), Err(WorkloadError::Config(_))));
    let yaml = CONFIG.replace("priority: 0", "priority: 11");
    assert!(matches!(ModelConfig::from_yaml_str(&yaml), Err(WorkloadError::Config(_))));
    let yaml = format!("{}  metrics_hard_limits:\n    flops: 0.5\n", CONFIG);
    assert!(matches!(ModelConfig::from_yaml_str(&yaml), Err(WorkloadError::Config(_))));
}

#[test]
fn test_pipeline_preserves_totals() {
    let source = profiled_workload();
    let source_totals = source.total_metrics_sum_dict();
    let model = WorkloadModel::new(ModelConfig::from_yaml_str(CONFIG).unwrap()).unwrap();
    let output = model.generate(vec![source]).unwrap();

    assert_eq!(output.report.total_source_jobs, 6);
    assert_eq!(output.report.total_generated_jobs, 6);
    assert_eq!(output.workload.len(), 6);

    let unscaled = output.workload.total_metrics_dict(false).unwrap();
    let scaled = output.workload.total_metrics_dict(true).unwrap();
    for kind in SignalKind::ALL.iter() {
        assert_float_eq(unscaled[kind], source_totals[kind], 1e-6);
    }
    assert_float_eq(scaled[&SignalKind::Flops], 2. * source_totals[&SignalKind::Flops], 1e-6);

    let names: Vec<&str> = output.workload.app_list.iter().map(|a| a.job_name.as_str()).collect();
    assert_eq!(names, vec!["appgen-0", "appgen-1", "appgen-2", "appgen-3", "appgen-4", "appgen-5"]);
    let starts: Vec<f64> = output.workload.app_list.iter().map(|a| a.time_start()).collect();
    assert!(starts.windows(2).all(|w| w[0] <= w[1]));
    assert!(output.workload.app_list.iter().all(|a| a.job.duration.is_none()));
}

#[test]
fn test_pipeline_is_reproducible() {
    let model = WorkloadModel::new(ModelConfig::from_yaml_str(CONFIG).unwrap()).unwrap();
    let first = model.generate(vec![profiled_workload()]).unwrap();
    let second = model.generate(vec![profiled_workload()]).unwrap();
    assert_eq!(first.workload.app_list, second.workload.app_list);
    assert_eq!(first.report, second.report);
}

#[test]
fn test_spawn_pipeline() {
    let yaml = CONFIG.replace("strategy: spawn_random", "strategy: spawn");
    let model = WorkloadModel::new(ModelConfig::from_yaml_str(&yaml).unwrap()).unwrap();
    let output = model.generate(vec![profiled_workload()]).unwrap();
    // 6 source jobs over 50 seconds, rescaled to 100 seconds
    assert_eq!(output.report.total_generated_jobs, 12);
    assert!(output.workload.app_list.iter().all(|a| a.job.ncpus == Some(2)));
    let unscaled = output.workload.total_metrics_dict(false).unwrap();
    let source = profiled_workload().total_metrics_sum_dict();
    assert_float_eq(unscaled[&SignalKind::Flops], source[&SignalKind::Flops], 1e-6);
}

#[test]
fn test_incomplete_jobs_fail_before_generation() {
    let yaml = CONFIG.replace("  - type: fill_missing_entries\n    apply_to: [hpc]\n    priority: 0\n", "");
    let yaml = yaml.replace("workload_filling:\n", "");
    let model = WorkloadModel::new(ModelConfig::from_yaml_str(&yaml).unwrap()).unwrap();
    let result = model.generate(vec![profiled_workload()]);
    assert!(matches!(
        result,
        Err(WorkloadError::MissingSignal {
            signal: SignalKind::KbRead,
            ..
        })
    ));
}

#[test]
fn test_unknown_workload() {
    let model = WorkloadModel::new(ModelConfig::from_yaml_str(CONFIG).unwrap()).unwrap();
    let result = model.generate(vec![WorkloadData::new("other", vec![])]);
    assert!(matches!(result, Err(WorkloadError::UnknownWorkload(tag)) if tag == "hpc"));
}

#[test]
fn test_ksf_export() {
    let model = WorkloadModel::new(ModelConfig::from_yaml_str(CONFIG).unwrap()).unwrap();
    let output = model.generate(vec![profiled_workload()]).unwrap();
    let ksf = output.workload.export_ksf("bench").unwrap();
    assert_eq!(ksf.tag, "KSF");
    assert_eq!(ksf.version, 1);
    assert_eq!(ksf.synthetic_apps.len(), 6);
    assert_eq!(ksf.scaling_factors[&SignalKind::Flops], 2.);
    assert_eq!(ksf.synthetic_apps[0].start_delay, 0.);
    assert_eq!(ksf.synthetic_apps[0].metadata.workload_name, "bench");
    assert_eq!(ksf.synthetic_apps[0].num_procs, 4);

    let json: serde_json::Value = serde_json::from_str(&ksf.to_json_string().unwrap()).unwrap();
    let app = &json["synthetic_apps"][0];
    assert_eq!(app["metadata"]["job_name"], "appgen-0");
    let first_kernel = &app["frames"][0][0];
    assert_eq!(first_kernel["name"], "cpu");
    assert!(first_kernel["flops"].is_i64());
    assert!(json["unscaled_metrics_sums"]["kb_write"].is_f64());
}

#[test]
fn test_tuning_factors_are_copied_per_app() {
    let apps = vec![
        SyntheticApp::new("a", job(0., &[(SignalKind::Flops, &[10.])])),
        SyntheticApp::new("b", job(1., &[(SignalKind::Flops, &[30.])])),
    ];
    let mut workload = SyntheticWorkload::new(apps, 1, SignalRegistry::new());
    assert!(matches!(
        workload.total_metrics_dict(true),
        Err(WorkloadError::TuningFactorsNotSet)
    ));
    assert!(matches!(workload.export_ksf("w"), Err(WorkloadError::TuningFactorsNotSet)));
    assert_eq!(workload.total_metrics_dict(false).unwrap()[&SignalKind::Flops], 40.);

    workload.set_tuning_factors(&BTreeMap::from([(SignalKind::Flops, 3.)]));
    workload.app_list[0].set_tuning_factor(BTreeMap::from([(SignalKind::Flops, 1.)]));
    assert_eq!(workload.app_list[1].tuning_factor().unwrap()[&SignalKind::Flops], 3.);
    assert_eq!(workload.app_list[1].tuning_factor().unwrap()[&SignalKind::NRead], 1.);
    assert_eq!(workload.tuning_factors().unwrap()[&SignalKind::Flops], 3.);
    assert_eq!(workload.total_metrics_dict(true).unwrap()[&SignalKind::Flops], 100.);
}

#[test]
fn test_relative_totals() {
    let apps = vec![SyntheticApp::new("a", job(0., &[(SignalKind::Flops, &[10., 20.])]))];
    let mut workload = SyntheticWorkload::new(apps, 2, SignalRegistry::new());
    workload.set_tuning_factors(&BTreeMap::from([(SignalKind::Flops, 2.)]));
    let relative = workload.relative_totals().unwrap();
    assert_float_eq(relative[&SignalKind::Flops], 1., 1e-12);
    assert_eq!(relative[&SignalKind::KbRead], 1.);
    assert_eq!(workload.total_metrics_apps().unwrap()[&SignalKind::Flops], 60.);
}

#[test]
fn test_split_by_keywords() {
    let workload = profiled_workload();
    let split = SplitConfig {
        apply_to: "hpc".to_string(),
        create_workload: "big".to_string(),
        split_by: JobAttribute::JobName,
        keywords_in: vec!["big".to_string()],
        keywords_out: vec!["-4".to_string()],
    };
    let big = workload.split_by_keywords(&split).unwrap();
    assert_eq!(big.tag, "big");
    let names: Vec<&str> = big.jobs.iter().map(|j| j.job_name.as_deref().unwrap()).collect();
    assert_eq!(names, vec!["big-0", "big-2"]);

    let by_user = SplitConfig {
        split_by: JobAttribute::User,
        ..split.clone()
    };
    assert!(workload.split_by_keywords(&by_user).unwrap().is_empty());

    let no_keywords = SplitConfig {
        keywords_in: vec![],
        keywords_out: vec![],
        ..split
    };
    assert!(matches!(
        workload.split_by_keywords(&no_keywords),
        Err(WorkloadError::Config(_))
    ));
}

#[test]
fn test_filling() {
    let mut workload = profiled_workload();
    let defaults = BTreeMap::from([(SignalKind::NRead, 5.)]);
    let filled = fill_missing_entries(&mut workload, &defaults, Some(1)).unwrap();
    assert_eq!(filled, 6 * 7);
    workload.check_jobs().unwrap();
    assert_eq!(workload.jobs[0].signal_sum(SignalKind::NRead), 5.);
    assert_eq!(workload.jobs[0].signal(SignalKind::KbRead).unwrap().priority, Some(1));

    let mut donor = job(0., &[(SignalKind::KbRead, &[7.]), (SignalKind::Flops, &[0.])]);
    donor.job_name = Some("big-0".to_string());
    let matched = match_by_keyword(&mut workload, &[donor], &[JobAttribute::JobName], Some(2)).unwrap();
    assert_eq!(matched, 1);
    // donor signals outrank both filled and unprioritized ones
    assert_eq!(workload.jobs[0].signal_sum(SignalKind::KbRead), 7.);
    assert_eq!(workload.jobs[0].signal_sum(SignalKind::Flops), 0.);
    assert_eq!(workload.jobs[1].signal_sum(SignalKind::KbRead), 0.);
}

#[test]
fn test_kprofile() {
    let json = r#"{
        "tag": "pbs",
        "profiled_jobs": [
            {
                "ncpus": 8,
                "time_start": 100.0,
                "time_end": 160.0,
                "job_name": "solver",
                "time_series": {
                    "flops": {"times": [0.0, 30.0], "values": [1.0, 2.0]},
                    "kb_read": {"times": [0.0], "values": [4.0], "durations": [60.0]}
                }
            }
        ]
    }"#;
    let workload = KProfile::from_json_str(json).unwrap().into_workload("fallback").unwrap();
    assert_eq!(workload.tag, "pbs");
    let job = &workload.jobs[0];
    assert_eq!(job.duration, Some(60.));
    assert_eq!(job.ncpus, Some(8));
    assert_eq!(job.signal(SignalKind::Flops).unwrap().priority, Some(PROFILE_PRIORITY));
    assert_eq!(job.signal(SignalKind::KbRead).unwrap().durations(), Some(&[60.][..]));
    assert!(job.signal(SignalKind::NWrite).is_none());

    let unknown = json.replace("\"kb_read\"", "\"kb_scratch\"");
    let result = KProfile::from_json_str(&unknown).unwrap().into_workload("fallback");
    assert!(matches!(result, Err(WorkloadError::UnknownSignal(name)) if name == "kb_scratch"));

    let untagged = json.replace("\"tag\": \"pbs\",", "");
    let workload = KProfile::from_json_str(&untagged).unwrap().into_workload("fallback").unwrap();
    assert_eq!(workload.tag, "fallback");
}

#[test]
fn test_workload_totals() {
    let mut partial = ModelJob::new(0., None, None);
    partial.set_signal(signal(SignalKind::Flops, &[3.]));
    let workload = WorkloadData::new("w", vec![job(10., &[(SignalKind::Flops, &[1., 2.])]), partial]);

    let sums = workload.total_metrics_sum_dict();
    assert_eq!(sums[&SignalKind::Flops], 6.);
    assert_eq!(sums[&SignalKind::KbRead], 0.);

    let series = workload.total_metrics_timesignals().unwrap();
    let flops = &series[&SignalKind::Flops];
    assert_eq!(flops.xvalues(), &[0., 10., 11.]);
    assert_eq!(flops.yvalues(), &[3., 1., 2.]);
    assert_eq!(series[&SignalKind::KbRead].xvalues(), &[10.]);
    assert_eq!(workload.time_range(), Some((0., 10.)));
    assert!(workload.check_jobs().is_err());
}
