use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use env_logger::{Builder, Env};
use log::info;

use dslab_workload::config::ModelConfig;
use dslab_workload::model::WorkloadModel;
use dslab_workload::workload::WorkloadData;

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
/// Generates synthetic workload from profiled jobs
struct Args {
    /// Path to YAML file with model configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Path to JSON file with profiled jobs (can be repeated)
    #[arg(short, long = "profile", required = true)]
    profiles: Vec<PathBuf>,

    /// Path to produced JSON file with synthetic workload
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to produced JSON file with model report
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Workload name stored in synthetic app metadata
    #[arg(short, long, default_value = "synthetic")]
    name: String,
}

fn main() -> anyhow::Result<()> {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();
    let args = Args::parse();

    let config = ModelConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;
    let workloads = args
        .profiles
        .iter()
        .map(|path| {
            WorkloadData::from_kprofile(path).with_context(|| format!("failed to read profile {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let model = WorkloadModel::new(config)?;
    let output = model.generate(workloads).context("workload generation failed")?;
    output.report.log_summary();

    let ksf = output.workload.export_ksf(&args.name)?;
    let report_json = output.report.to_json_string()?;

    let output_path = args.output.unwrap_or_else(|| {
        let stem = args
            .config
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "workload".to_string());
        args.config.with_file_name(format!("{}-synthetic.json", stem))
    });
    ksf.write(&output_path)
        .with_context(|| format!("failed to write {}", output_path.display()))?;
    info!("Synthetic workload written to {}", output_path.display());
    if let Some(path) = args.report {
        std::fs::write(&path, report_json).with_context(|| format!("failed to write {}", path.display()))?;
        info!("Report written to {}", path.display());
    }
    Ok(())
}
