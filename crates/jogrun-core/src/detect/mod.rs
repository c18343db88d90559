//! Sensor-driven phase detection.
//!
//! - [`classifier`]: stateless hysteresis classification
//! - [`calibration`]: first-interval cadence calibration
//! - [`sensor`]: subscriptions and signal conditioning
//! - [`coordinator`]: ties the three together for one workout

pub mod calibration;
pub mod classifier;
pub mod coordinator;
pub mod sensor;

pub use calibration::{
    Calibration, CalibrationData, CalibrationEngine, CalibrationSettings, CalibrationStatus,
};
pub use classifier::{classify, ClassifierConfig};
pub use coordinator::{AutoDetectCoordinator, AutoDetectResult, DetectionDefaults};
pub use sensor::{
    CadenceWindow, Deliver, SensorFeed, SensorHub, SensorKind, SensorReading, SensorSource,
    SpeedFilter, Subscription, SubscriptionId,
};
