//! Synthetic HPC workload modelling.
//!
//! Profiled jobs are converted into uniformly binned resource usage signals, grouped by
//! similarity and used to generate a synthetic workload that reproduces the totals and the
//! submission pattern of the source workloads. The result is exported as a list of synthetic
//! applications made of bounded kernel frames.
//!
//! The pipeline is driven by [`model::WorkloadModel`].

pub mod clustering;
pub mod config;
pub mod error;
pub mod filling;
pub mod generation;
pub mod job;
pub mod kernels;
pub mod kprofile;
pub mod ksf;
pub mod model;
pub mod report;
pub mod signal;
pub mod synthetic_app;
pub mod synthetic_workload;
pub mod time_signal;
pub mod workload;
