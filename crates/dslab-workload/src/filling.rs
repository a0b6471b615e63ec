//! Completion of missing job signals before clustering.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use log::info;

use crate::config::FillingOperation;
use crate::error::{Result, WorkloadError};
use crate::job::{JobAttribute, ModelJob};
use crate::signal::SignalKind;
use crate::time_signal::TimeSignal;
use crate::workload::WorkloadData;

/// Applies filling operations in order to the named workloads.
pub fn apply_filling(workloads: &mut IndexMap<String, WorkloadData>, operations: &[FillingOperation]) -> Result<()> {
    for op in operations.iter() {
        for tag in op.apply_to().iter() {
            if !workloads.contains_key(tag) {
                return Err(WorkloadError::UnknownWorkload(tag.clone()));
            }
        }
        match op {
            FillingOperation::FillMissingEntries {
                apply_to,
                default_values,
                priority,
            } => {
                for tag in apply_to.iter() {
                    let workload = &mut workloads[tag.as_str()];
                    let filled = fill_missing_entries(workload, default_values, *priority)?;
                    info!("Filled {} missing signals in workload {}", filled, tag);
                }
            }
            FillingOperation::MatchByKeyword {
                apply_to,
                source_workloads,
                match_by,
                priority,
            } => {
                let mut donors = Vec::new();
                for tag in source_workloads.iter() {
                    let source = workloads
                        .get(tag)
                        .ok_or_else(|| WorkloadError::UnknownWorkload(tag.clone()))?;
                    donors.extend(source.jobs.iter().cloned());
                }
                for tag in apply_to.iter() {
                    let workload = &mut workloads[tag.as_str()];
                    let matched = match_by_keyword(workload, &donors, match_by, *priority)?;
                    info!("Matched {} jobs of workload {} by {:?}", matched, tag, match_by);
                }
            }
        }
    }
    Ok(())
}

/// Fills every empty signal slot with a single sample holding the metric's default value
/// (zero when not listed). Returns the number of filled slots.
pub fn fill_missing_entries(
    workload: &mut WorkloadData,
    default_values: &BTreeMap<SignalKind, f64>,
    priority: Option<u8>,
) -> Result<usize> {
    let mut filled = 0;
    for job in workload.jobs.iter_mut() {
        for kind in SignalKind::ALL.iter() {
            if job.signal(*kind).is_some() {
                continue;
            }
            let value = default_values.get(kind).copied().unwrap_or(0.);
            job.set_signal(TimeSignal::from_values(kind.name(), vec![0.], vec![value], None, priority)?);
            filled += 1;
        }
    }
    Ok(filled)
}

/// Merges into each job the signals of the first donor whose `match_by` attributes are all
/// present and equal to the job's. Donor signals take `priority` before the merge, so they only
/// replace signals of lower priority.
///
/// Returns the number of jobs that found a donor.
pub fn match_by_keyword(
    workload: &mut WorkloadData,
    donors: &[ModelJob],
    match_by: &[JobAttribute],
    priority: Option<u8>,
) -> Result<usize> {
    let mut matched = 0;
    for job in workload.jobs.iter_mut() {
        let donor = donors.iter().find(|donor| {
            match_by.iter().all(|attr| match (job.attribute(*attr), donor.attribute(*attr)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            })
        });
        if let Some(donor) = donor {
            let mut donor = donor.clone();
            for slot in donor.timesignals.values_mut() {
                if let Some(signal) = slot.as_ref() {
                    *slot = Some(signal.with_priority(priority)?);
                }
            }
            job.merge_signals(&donor);
            matched += 1;
        }
    }
    Ok(matched)
}
