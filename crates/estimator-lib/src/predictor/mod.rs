//! Resource prediction from build contexts

mod output;
mod service;

pub use output::{
    assess_confidence, OutputConfig, OutputFormatter, Prediction, MAX_CPU_PCT, MIN_CPU_PCT,
    MIN_MEMORY_GB, MIN_TIME_MIN,
};
pub use service::{PredictionPayload, PredictionService, PREDICTION_METHOD};

#[cfg(test)]
mod tests;
