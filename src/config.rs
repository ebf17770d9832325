use std::env;
use std::str::FromStr;

/// Errors raised while loading the agent configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },

    #[error("Unsupported economizer type '{0}', expected DDB or HL")]
    EconomizerType(String),
}

/// Economizer control strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EconomizerType {
    /// Differential dry-bulb: economize while OAT is below RAT.
    DifferentialDryBulb,
    /// High limit: economize while OAT is below a fixed changeover temperature.
    HighLimit,
}

impl FromStr for EconomizerType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ddb" => Ok(EconomizerType::DifferentialDryBulb),
            "hl" => Ok(EconomizerType::HighLimit),
            _ => Err(ConfigError::EconomizerType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceType {
    Ahu,
    Rtu,
    /// Kept so the orchestrator can report the bad value on every run.
    Unsupported(String),
}

impl From<&str> for DeviceType {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "ahu" => DeviceType::Ahu,
            "rtu" => DeviceType::Rtu,
            other => DeviceType::Unsupported(other.to_string()),
        }
    }
}

/// Diagnostic thresholds. Temperatures in °F, positions and fractions in %,
/// durations in minutes.
#[derive(Debug, Clone, PartialEq)]
pub struct RcxConfig {
    pub economizer_type: EconomizerType,
    pub econ_hl_temp: f64,
    pub device_type: DeviceType,
    pub temp_deadband: f64,
    pub data_window: f64,
    pub no_required_data: usize,
    pub open_damper_time: f64,
    pub low_supply_fan_threshold: f64,
    pub mat_low_threshold: f64,
    pub mat_high_threshold: f64,
    pub oat_low_threshold: f64,
    pub oat_high_threshold: f64,
    pub rat_low_threshold: f64,
    pub rat_high_threshold: f64,
    pub temp_difference_threshold: f64,
    pub oat_mat_check: f64,
    pub open_damper_threshold: f64,
    pub oaf_economizing_threshold: f64,
    pub oaf_temperature_threshold: f64,
    pub cooling_enabled_threshold: f64,
    pub minimum_damper_setpoint: f64,
    pub excess_damper_threshold: f64,
    pub excess_oaf_threshold: f64,
    pub desired_oaf: f64,
    pub ventilation_oaf_threshold: f64,
    pub insufficient_damper_threshold: f64,
    pub temp_damper_threshold: f64,
    pub rated_cfm: f64,
    pub eer: f64,
    /// Windows spanning longer than this are reported inconclusive.
    pub max_dx_time: f64,
}

impl Default for RcxConfig {
    fn default() -> Self {
        Self {
            economizer_type: EconomizerType::DifferentialDryBulb,
            econ_hl_temp: 65.0,
            device_type: DeviceType::Ahu,
            temp_deadband: 1.0,
            data_window: 30.0,
            no_required_data: 20,
            open_damper_time: 5.0,
            low_supply_fan_threshold: 20.0,
            mat_low_threshold: 50.0,
            mat_high_threshold: 90.0,
            oat_low_threshold: 30.0,
            oat_high_threshold: 100.0,
            rat_low_threshold: 50.0,
            rat_high_threshold: 90.0,
            temp_difference_threshold: 4.0,
            oat_mat_check: 5.0,
            open_damper_threshold: 90.0,
            oaf_economizing_threshold: 25.0,
            oaf_temperature_threshold: 4.0,
            cooling_enabled_threshold: 5.0,
            minimum_damper_setpoint: 15.0,
            excess_damper_threshold: 20.0,
            excess_oaf_threshold: 20.0,
            desired_oaf: 10.0,
            ventilation_oaf_threshold: 5.0,
            insufficient_damper_threshold: 15.0,
            temp_damper_threshold: 90.0,
            rated_cfm: 1000.0,
            eer: 10.0,
            max_dx_time: 60.0,
        }
    }
}

/// Point-name prefixes used to pick values out of a device scrape.
///
/// Every point whose lower-cased name starts with a prefix contributes to that
/// role's average.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointNames {
    pub fan_status: String,
    pub fan_speed: Option<String>,
    pub outdoor_air_temp: String,
    pub return_air_temp: String,
    pub mixed_air_temp: String,
    pub damper_signal: String,
    pub cooling_call: String,
}

impl Default for PointNames {
    fn default() -> Self {
        Self {
            fan_status: "supplyfanstatus".to_string(),
            fan_speed: Some("supplyfanspeed".to_string()),
            outdoor_air_temp: "outdoorairtemperature".to_string(),
            return_air_temp: "returnairtemperature".to_string(),
            mixed_air_temp: "mixedairtemperature".to_string(),
            damper_signal: "outdoordampersignal".to_string(),
            cooling_call: "coolcall".to_string(),
        }
    }
}

/// Runtime settings of the driver service
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub trend_file: String,
    pub database_url: Option<String>,
    pub rcx: RcxConfig,
    pub points: PointNames,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load environment variables
        dotenv::dotenv().ok();

        let trend_file = env::var("TREND_FILE").map_err(|_| ConfigError::Missing("TREND_FILE"))?;
        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        Ok(AgentConfig {
            trend_file,
            database_url,
            rcx: RcxConfig::from_lookup(|key| env::var(key).ok())?,
            points: PointNames::from_lookup(|key| env::var(key).ok()),
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

/// Parse a number that must be finite and accepted by `valid`.
fn parse_checked(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: f64,
    valid: impl Fn(f64) -> bool,
) -> Result<f64, ConfigError> {
    let parsed: f64 = parse_or(lookup, key, default)?;
    if parsed.is_finite() && valid(parsed) {
        Ok(parsed)
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: lookup(key).unwrap_or_else(|| parsed.to_string()),
        })
    }
}

fn parse_finite(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: f64,
) -> Result<f64, ConfigError> {
    parse_checked(lookup, key, default, |_| true)
}

/// Durations in minutes cannot be negative.
fn parse_minutes(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: f64,
) -> Result<f64, ConfigError> {
    parse_checked(lookup, key, default, |minutes| minutes >= 0.0)
}

impl RcxConfig {
    /// Build a configuration from `RCX_*` keys, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let d = RcxConfig::default();
        let economizer_type = match lookup("RCX_ECONOMIZER_TYPE") {
            Some(value) => value.parse()?,
            None => d.economizer_type,
        };
        let device_type = lookup("RCX_DEVICE_TYPE")
            .map(|value| DeviceType::from(value.as_str()))
            .unwrap_or(d.device_type);

        Ok(RcxConfig {
            economizer_type,
            econ_hl_temp: parse_finite(&lookup, "RCX_ECON_HL_TEMP", d.econ_hl_temp)?,
            device_type,
            temp_deadband: parse_finite(&lookup, "RCX_TEMP_DEADBAND", d.temp_deadband)?,
            data_window: parse_minutes(&lookup, "RCX_DATA_WINDOW", d.data_window)?,
            no_required_data: parse_or(&lookup, "RCX_NO_REQUIRED_DATA", d.no_required_data)?,
            open_damper_time: parse_minutes(&lookup, "RCX_OPEN_DAMPER_TIME", d.open_damper_time)?,
            low_supply_fan_threshold: parse_finite(
                &lookup,
                "RCX_LOW_SUPPLY_FAN_THRESHOLD",
                d.low_supply_fan_threshold,
            )?,
            mat_low_threshold: parse_finite(&lookup, "RCX_MAT_LOW_THRESHOLD", d.mat_low_threshold)?,
            mat_high_threshold: parse_finite(&lookup, "RCX_MAT_HIGH_THRESHOLD", d.mat_high_threshold)?,
            oat_low_threshold: parse_finite(&lookup, "RCX_OAT_LOW_THRESHOLD", d.oat_low_threshold)?,
            oat_high_threshold: parse_finite(&lookup, "RCX_OAT_HIGH_THRESHOLD", d.oat_high_threshold)?,
            rat_low_threshold: parse_finite(&lookup, "RCX_RAT_LOW_THRESHOLD", d.rat_low_threshold)?,
            rat_high_threshold: parse_finite(&lookup, "RCX_RAT_HIGH_THRESHOLD", d.rat_high_threshold)?,
            temp_difference_threshold: parse_finite(
                &lookup,
                "RCX_TEMP_DIFFERENCE_THRESHOLD",
                d.temp_difference_threshold,
            )?,
            oat_mat_check: parse_finite(&lookup, "RCX_OAT_MAT_CHECK", d.oat_mat_check)?,
            open_damper_threshold: parse_finite(
                &lookup,
                "RCX_OPEN_DAMPER_THRESHOLD",
                d.open_damper_threshold,
            )?,
            oaf_economizing_threshold: parse_finite(
                &lookup,
                "RCX_OAF_ECONOMIZING_THRESHOLD",
                d.oaf_economizing_threshold,
            )?,
            oaf_temperature_threshold: parse_finite(
                &lookup,
                "RCX_OAF_TEMPERATURE_THRESHOLD",
                d.oaf_temperature_threshold,
            )?,
            cooling_enabled_threshold: parse_finite(
                &lookup,
                "RCX_COOLING_ENABLED_THRESHOLD",
                d.cooling_enabled_threshold,
            )?,
            minimum_damper_setpoint: parse_finite(
                &lookup,
                "RCX_MINIMUM_DAMPER_SETPOINT",
                d.minimum_damper_setpoint,
            )?,
            excess_damper_threshold: parse_finite(
                &lookup,
                "RCX_EXCESS_DAMPER_THRESHOLD",
                d.excess_damper_threshold,
            )?,
            excess_oaf_threshold: parse_finite(
                &lookup,
                "RCX_EXCESS_OAF_THRESHOLD",
                d.excess_oaf_threshold,
            )?,
            desired_oaf: parse_finite(&lookup, "RCX_DESIRED_OAF", d.desired_oaf)?,
            ventilation_oaf_threshold: parse_finite(
                &lookup,
                "RCX_VENTILATION_OAF_THRESHOLD",
                d.ventilation_oaf_threshold,
            )?,
            insufficient_damper_threshold: parse_finite(
                &lookup,
                "RCX_INSUFFICIENT_DAMPER_THRESHOLD",
                d.insufficient_damper_threshold,
            )?,
            temp_damper_threshold: parse_finite(
                &lookup,
                "RCX_TEMP_DAMPER_THRESHOLD",
                d.temp_damper_threshold,
            )?,
            rated_cfm: parse_finite(&lookup, "RCX_RATED_CFM", d.rated_cfm)?,
            eer: parse_finite(&lookup, "RCX_EER", d.eer)?,
            max_dx_time: parse_minutes(&lookup, "RCX_MAX_DX_TIME", d.max_dx_time)?,
        })
    }
}

impl PointNames {
    /// Read `RCX_POINT_*` prefixes; `RCX_POINT_FAN_SPEED=` (empty) disables the
    /// fan speed point.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = PointNames::default();
        let prefix = |key: &str, default: String| {
            lookup(key)
                .map(|value| value.trim().to_lowercase())
                .filter(|value| !value.is_empty())
                .unwrap_or(default)
        };
        let fan_speed = match lookup("RCX_POINT_FAN_SPEED") {
            Some(value) if value.trim().is_empty() => None,
            Some(value) => Some(value.trim().to_lowercase()),
            None => d.fan_speed.clone(),
        };

        PointNames {
            fan_status: prefix("RCX_POINT_FAN_STATUS", d.fan_status),
            fan_speed,
            outdoor_air_temp: prefix("RCX_POINT_OAT", d.outdoor_air_temp),
            return_air_temp: prefix("RCX_POINT_RAT", d.return_air_temp),
            mixed_air_temp: prefix("RCX_POINT_MAT", d.mixed_air_temp),
            damper_signal: prefix("RCX_POINT_DAMPER_SIGNAL", d.damper_signal),
            cooling_call: prefix("RCX_POINT_COOLING_CALL", d.cooling_call),
        }
    }
}
