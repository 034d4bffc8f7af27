//! Carbon accounting: historical trace lookup (C1), energy sampling (C2),
//! and the reporter that combines them (C3).

pub mod energy;
pub mod report;
pub mod trace;

pub use energy::{EnergySampler, PowerMeasureMethod};
pub use report::CarbonReporter;
pub use trace::CarbonTraceStore;
