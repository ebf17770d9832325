//! Economizer retro-commissioning diagnostics for air handlers and rooftop units.
//!
//! Feed [`Application::run`] one device scrape per timestep; it returns the
//! verdict rows and log lines produced by the five economizer diagnostics.

pub mod application;
pub mod config;
pub mod database;
pub mod diagnostics;
pub mod energy;
pub mod models;
pub mod points;
pub mod prerequisites;
pub mod trend;
pub mod utils;
pub mod window;

pub use application::Application;
pub use config::{AgentConfig, ConfigError, DeviceType, EconomizerType, PointNames, RcxConfig};
pub use models::{
    Color, DiagnosticCode, DiagnosticName, DiagnosticResult, FaultState, SensorSample, Verdict,
};
