//! Activity samples and the sensor that produces them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One observation of the focused application and window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Focused application name (e.g. "Google Chrome").
    pub application: String,
    /// Window title or, for browsers, the active tab's domain. May be empty.
    pub window_label: String,
    pub captured_at: DateTime<Utc>,
}

impl Sample {
    pub fn new(
        application: impl Into<String>,
        window_label: impl Into<String>,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            application: application.into(),
            window_label: window_label.into(),
            captured_at,
        }
    }
}

/// Sensor failures. Never fatal: the sample is skipped.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("sensor failed")]
    Io(#[from] std::io::Error),
}

/// Platform hook reporting what currently has focus.
pub trait Sensor {
    fn sample(&mut self, now: DateTime<Utc>) -> Result<Sample, SensorError>;
}

impl<S: Sensor + ?Sized> Sensor for Box<S> {
    fn sample(&mut self, now: DateTime<Utc>) -> Result<Sample, SensorError> {
        (**self).sample(now)
    }
}
