use std::collections::BTreeMap;

use log::debug;

use crate::job::ModelJob;
use crate::signal::SignalKind;
use crate::workload::total_metrics_sum;

/// Per-metric factors making generated sums equal to source sums.
///
/// `None` marks metrics whose generated sum is zero; they cannot be rescaled.
pub fn normalization_factors(source: &[ModelJob], generated: &[ModelJob]) -> BTreeMap<SignalKind, Option<f64>> {
    let source_sums = total_metrics_sum(source);
    let generated_sums = total_metrics_sum(generated);
    SignalKind::ALL
        .iter()
        .map(|kind| {
            let generated_sum = generated_sums[kind];
            let factor = if generated_sum != 0. {
                Some(source_sums[kind] / generated_sum)
            } else {
                None
            };
            (*kind, factor)
        })
        .collect()
}

/// Rescales the generated jobs so that every metric sums to the same total as in `source`.
pub fn normalize_jobs(source: &[ModelJob], mut generated: Vec<ModelJob>) -> Vec<ModelJob> {
    let factors = normalization_factors(source, &generated);
    for (kind, factor) in factors.iter() {
        match factor {
            Some(factor) => {
                debug!("Normalization factor of {}: {:.6}", kind, factor);
                for job in generated.iter_mut() {
                    if let Some(signal) = job.signal_mut(*kind) {
                        signal.scale_in_place(*factor);
                    }
                }
            }
            None => debug!("Generated jobs have zero {}, left unscaled", kind),
        }
    }
    generated
}
