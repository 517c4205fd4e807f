/// Unit system reported by the bridge in each status line. Field offsets in a
/// status line differ between the two layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSystem {
    Celsius,
    Fahrenheit,
}

impl UnitSystem {
    /// The unit marker character at its fixed status-line offset. Anything
    /// other than 'C' is treated as Fahrenheit.
    pub fn from_status_char(c: char) -> Self {
        if c == 'C' {
            UnitSystem::Celsius
        } else {
            UnitSystem::Fahrenheit
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemMode {
    Cool,
    Heat,
    Auto,
    Dry,
    Fan,
}

impl SystemMode {
    pub fn as_token(&self) -> &'static str {
        match self {
            SystemMode::Cool => "cool",
            SystemMode::Heat => "heat",
            SystemMode::Auto => "auto",
            SystemMode::Dry => "dry",
            SystemMode::Fan => "fan",
        }
    }

    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "cool" => Some(SystemMode::Cool),
            "heat" => Some(SystemMode::Heat),
            "auto" => Some(SystemMode::Auto),
            "dry" => Some(SystemMode::Dry),
            "fan" => Some(SystemMode::Fan),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanSpeed {
    Low,
    Medium,
    High,
    Top,
    Auto,
}

impl FanSpeed {
    pub fn as_token(&self) -> &'static str {
        match self {
            FanSpeed::Low => "low",
            FanSpeed::Medium => "med",
            FanSpeed::High => "high",
            FanSpeed::Top => "top",
            FanSpeed::Auto => "auto",
        }
    }

    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "low" => Some(FanSpeed::Low),
            "med" => Some(FanSpeed::Medium),
            "high" => Some(FanSpeed::High),
            "top" => Some(FanSpeed::Top),
            "auto" => Some(FanSpeed::Auto),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetpointDirection {
    Up,
    Down,
}

impl SetpointDirection {
    pub(crate) fn delta(&self) -> f64 {
        match self {
            SetpointDirection::Up => 1.0,
            SetpointDirection::Down => -1.0,
        }
    }
}

/// Point-in-time copy of one zone's state, as returned by the query API.
#[derive(Debug, Clone, Default)]
pub struct ZoneState {
    pub uid: String,
    pub name: String,
    pub unit: Option<UnitSystem>,
    pub on: bool,
    pub setpoint: f64,
    pub setpoint_raw: String,
    pub temperature: f64,
    pub temperature_raw: String,
    pub fan_speed: String,
    pub system_mode: String,
    pub demand: bool,
}

/// Events emitted to registered callbacks when state changes.
///
/// `fan_speed` and `mode` carry the bridge's raw tokens (e.g. `"High"`,
/// `"Cool"`) exactly as reported; setpoint and temperature carry both the
/// parsed value and the raw fixed-width string it was derived from.
#[derive(Debug, Clone)]
pub enum Event {
    ConnectionChanged { connected: bool },
    ZonePowerChanged { uid: String, name: String, on: bool },
    ZoneSetpointChanged { uid: String, name: String, setpoint: f64, raw: String },
    ZoneTemperatureChanged { uid: String, name: String, temperature: f64, raw: String },
    ZoneFanSpeedChanged { uid: String, name: String, speed: String },
    ZoneModeChanged { uid: String, name: String, mode: String },
    ZoneDemandChanged { uid: String, name: String, demand: bool },
}
