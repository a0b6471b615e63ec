//! Resource usage time series and their digitization into uniform bins.

use std::f64::consts::PI;

use crate::error::{Result, WorkloadError};
use crate::signal::{Behaviour, SignalKind};

/// Margin added to the right edge of the binning range so that the last sample falls inside it.
const EDGE_EPSILON: f64 = 1.0e-6;

/// Highest allowed signal priority.
pub const MAX_PRIORITY: u8 = 10;

/// Frequency domain description a signal was synthesized from.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub freqs: Vec<f64>,
    pub ampls: Vec<f64>,
    pub phases: Vec<f64>,
}

/// Time series of one metric of one job.
///
/// Samples are stored sorted by time. Timestamps need not be uniform; each sample may carry the
/// time span it was measured over (`durations`), in which case digitization spreads its value over
/// the bins covered by that span.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSignal {
    /// Signal name, usually equal to the name of its base metric.
    pub name: String,
    /// Base metric the signal is an instance of.
    pub kind: SignalKind,
    /// Trust rank used when signals from several sources are merged (higher wins).
    pub priority: Option<u8>,
    xvalues: Vec<f64>,
    yvalues: Vec<f64>,
    durations: Option<Vec<f64>>,
    spectrum: Option<Spectrum>,
}

impl TimeSignal {
    /// Creates signal from samples, its base metric is resolved from `name`.
    pub fn from_values(
        name: &str,
        xvalues: Vec<f64>,
        yvalues: Vec<f64>,
        durations: Option<Vec<f64>>,
        priority: Option<u8>,
    ) -> Result<Self> {
        let kind = name.parse::<SignalKind>()?;
        Self::with_base_signal(name, kind, xvalues, yvalues, durations, priority)
    }

    /// Creates signal named `name` which is an instance of the metric `kind`.
    pub fn with_base_signal(
        name: &str,
        kind: SignalKind,
        xvalues: Vec<f64>,
        yvalues: Vec<f64>,
        durations: Option<Vec<f64>>,
        priority: Option<u8>,
    ) -> Result<Self> {
        if xvalues.len() != yvalues.len() {
            return Err(WorkloadError::SignalLength {
                name: name.to_string(),
                detail: format!("{} timestamps but {} values", xvalues.len(), yvalues.len()),
            });
        }
        if let Some(d) = durations.as_ref() {
            if d.len() != xvalues.len() {
                return Err(WorkloadError::SignalLength {
                    name: name.to_string(),
                    detail: format!("{} timestamps but {} durations", xvalues.len(), d.len()),
                });
            }
        }
        check_priority(name, priority)?;

        let mut order: Vec<usize> = (0..xvalues.len()).collect();
        order.sort_by(|&a, &b| xvalues[a].total_cmp(&xvalues[b]));
        let durations = durations.map(|d| order.iter().map(|&i| d[i]).collect());
        Ok(Self {
            name: name.to_string(),
            kind,
            priority,
            xvalues: order.iter().map(|&i| xvalues[i]).collect(),
            yvalues: order.iter().map(|&i| yvalues[i]).collect(),
            durations,
            spectrum: None,
        })
    }

    /// Synthesizes signal as the absolute value of a sum of phase-shifted sines sampled at `time`.
    pub fn from_spectrum(
        name: &str,
        time: Vec<f64>,
        freqs: Vec<f64>,
        ampls: Vec<f64>,
        phases: Vec<f64>,
        priority: Option<u8>,
    ) -> Result<Self> {
        if freqs.len() != ampls.len() || freqs.len() != phases.len() {
            return Err(WorkloadError::SignalLength {
                name: name.to_string(),
                detail: format!(
                    "spectrum has {} frequencies, {} amplitudes and {} phases",
                    freqs.len(),
                    ampls.len(),
                    phases.len()
                ),
            });
        }
        let t0 = time.first().copied().unwrap_or(0.);
        let yvalues = time
            .iter()
            .map(|t| {
                freqs
                    .iter()
                    .zip(ampls.iter())
                    .zip(phases.iter())
                    .map(|((f, a), p)| a * (2. * PI * f * (t - t0) + p).sin())
                    .sum::<f64>()
                    .abs()
            })
            .collect();
        let mut signal = Self::from_values(name, time, yvalues, None, priority)?;
        signal.spectrum = Some(Spectrum { freqs, ampls, phases });
        Ok(signal)
    }

    pub fn xvalues(&self) -> &[f64] {
        &self.xvalues
    }

    pub fn yvalues(&self) -> &[f64] {
        &self.yvalues
    }

    pub fn durations(&self) -> Option<&[f64]> {
        self.durations.as_deref()
    }

    pub fn spectrum(&self) -> Option<&Spectrum> {
        self.spectrum.as_ref()
    }

    pub fn len(&self) -> usize {
        self.xvalues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xvalues.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.yvalues.iter().sum()
    }

    pub fn mean(&self) -> f64 {
        if self.yvalues.is_empty() {
            0.
        } else {
            self.sum() / self.yvalues.len() as f64
        }
    }

    /// Returns copy of the signal with a different priority.
    pub fn with_priority(&self, priority: Option<u8>) -> Result<Self> {
        check_priority(&self.name, priority)?;
        Ok(Self {
            priority,
            ..self.clone()
        })
    }

    /// Returns copy of the signal with all values multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        let mut signal = self.clone();
        signal.scale_in_place(factor);
        signal
    }

    pub fn scale_in_place(&mut self, factor: f64) {
        for y in self.yvalues.iter_mut() {
            *y *= factor;
        }
    }

    /// Returns copy of the signal with all timestamps moved by `dt`.
    pub fn shifted(&self, dt: f64) -> Self {
        let mut signal = self.clone();
        for x in signal.xvalues.iter_mut() {
            *x += dt;
        }
        signal
    }

    /// Resamples the signal into `nbins` uniform bins.
    ///
    /// Returns bin midpoints and bin values. With `None` the raw samples are returned unchanged.
    pub fn digitized(&self, nbins: Option<usize>) -> Result<(Vec<f64>, Vec<f64>)> {
        self.digitized_as(nbins, self.kind.behaviour())
    }

    /// Same as [`digitized`](TimeSignal::digitized), but combines samples with the given behaviour
    /// instead of the one declared for the base metric.
    pub fn digitized_as(&self, nbins: Option<usize>, behaviour: Behaviour) -> Result<(Vec<f64>, Vec<f64>)> {
        let nbins = match nbins {
            None => return Ok((self.xvalues.clone(), self.yvalues.clone())),
            Some(0) => {
                return Err(WorkloadError::Config(format!(
                    "signal {}: number of bins must be positive",
                    self.name
                )))
            }
            Some(n) => n,
        };
        if self.xvalues.is_empty() {
            return Ok(((0..nbins).map(|i| i as f64 + 0.5).collect(), vec![0.; nbins]));
        }
        match self.durations.as_ref() {
            Some(durations) => Ok(self.digitize_durations(durations, nbins, behaviour)),
            None => Ok(self.digitize_points(nbins, behaviour)),
        }
    }

    fn digitize_points(&self, nbins: usize, behaviour: Behaviour) -> (Vec<f64>, Vec<f64>) {
        let first = self.xvalues[0];
        let last = self.xvalues[self.xvalues.len() - 1] + EDGE_EPSILON;
        let width = (last - first) / nbins as f64;

        let mut sums = vec![0.; nbins];
        let mut counts = vec![0usize; nbins];
        for (x, y) in self.xvalues.iter().zip(self.yvalues.iter()) {
            let bin = usize::min(((x - first) / width).floor() as usize, nbins - 1);
            sums[bin] += y;
            counts[bin] += 1;
        }
        let values = match behaviour {
            Behaviour::Sum => sums,
            Behaviour::Mean => sums
                .iter()
                .zip(counts.iter())
                .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0. })
                .collect(),
        };
        (bin_midpoints(first, width, nbins), values)
    }

    fn digitize_durations(&self, durations: &[f64], nbins: usize, behaviour: Behaviour) -> (Vec<f64>, Vec<f64>) {
        let end = self
            .xvalues
            .iter()
            .zip(durations.iter())
            .map(|(x, d)| x + d)
            .fold(f64::MIN, f64::max)
            + EDGE_EPSILON;
        let width = end / nbins as f64;
        let edge = |i: usize| i as f64 * width;

        let mut values = vec![0.; nbins];
        let mut weights = vec![0.; nbins];
        for ((&x, &y), &d) in self.xvalues.iter().zip(self.yvalues.iter()).zip(durations.iter()) {
            let stop = x + d;
            let first = usize::min((x / width).floor() as usize, nbins - 1);
            let mut last = usize::min((stop / width).ceil() as usize, nbins);
            if last <= first {
                last = first + 1;
            }
            if last - first == 1 || d <= 0. {
                values[first] += y;
                weights[first] += 1.;
                continue;
            }
            for bin in first..last {
                let overlap = f64::min(edge(bin + 1), stop) - f64::max(edge(bin), x);
                if overlap > 0. {
                    let fraction = overlap / d;
                    match behaviour {
                        Behaviour::Sum => values[bin] += y * fraction,
                        Behaviour::Mean => {
                            values[bin] += y * fraction;
                            weights[bin] += fraction;
                        }
                    }
                }
            }
        }
        if behaviour == Behaviour::Mean {
            for (v, w) in values.iter_mut().zip(weights.iter()) {
                if *w > 0. {
                    *v /= w;
                }
            }
        }
        let value_type = self.kind.value_type();
        let values = values.into_iter().map(|v| value_type.cast(v)).collect();
        (bin_midpoints(0., width, nbins), values)
    }
}

fn bin_midpoints(first: f64, width: f64, nbins: usize) -> Vec<f64> {
    (0..nbins).map(|i| first + (i as f64 + 0.5) * width).collect()
}

fn check_priority(name: &str, priority: Option<u8>) -> Result<()> {
    match priority {
        Some(p) if p > MAX_PRIORITY => Err(WorkloadError::InvalidPriority {
            name: name.to_string(),
            priority: p,
        }),
        _ => Ok(()),
    }
}
