use std::fmt;

use serde::Serialize;

/// Temperature stored as Celsius.
/// The gateway works in 0.5 degree steps, one step per byte value above 32.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Temperature(f64);

impl Temperature {
    pub fn from_celsius(c: f64) -> Self {
        Self(c)
    }

    pub fn celsius(&self) -> f64 {
        self.0
    }

    /// Round to gateway precision (0.5 increments).
    pub fn to_half_degrees(&self) -> f64 {
        (self.0 * 2.0).round() / 2.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}\u{00b0}C", self.0)
    }
}

/// Operating mode reported in a thermostat summary record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Mode {
    Offline,
    Auto,
    High,
    Medium,
    Low,
    Party,
    Away,
    Frost,
    On,
    Undefined,
}

impl Mode {
    /// Symbolic name as shown to users. Preset modes share their preset's name.
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Offline => "OFFLINE",
            Mode::On => "ON",
            Mode::Undefined => "UNDEFINED",
            Mode::Auto => Preset::Auto.as_str(),
            Mode::High => Preset::High.as_str(),
            Mode::Medium => Preset::Medium.as_str(),
            Mode::Low => Preset::Low.as_str(),
            Mode::Party => Preset::Party.as_str(),
            Mode::Away => Preset::Away.as_str(),
            Mode::Frost => Preset::Frost.as_str(),
        }
    }

    /// The preset this mode corresponds to, if any.
    pub fn preset(&self) -> Option<Preset> {
        match self {
            Mode::Auto => Some(Preset::Auto),
            Mode::High => Some(Preset::High),
            Mode::Medium => Some(Preset::Medium),
            Mode::Low => Some(Preset::Low),
            Mode::Party => Some(Preset::Party),
            Mode::Away => Some(Preset::Away),
            Mode::Frost => Some(Preset::Frost),
            Mode::Offline | Mode::On | Mode::Undefined => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named operating mode the gateway accepts as a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Preset {
    Auto,
    High,
    Medium,
    Low,
    Party,
    Away,
    Frost,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Auto => "Auto",
            Preset::High => "High",
            Preset::Medium => "Medium",
            Preset::Low => "Low",
            Preset::Party => "Party",
            Preset::Away => "Away",
            Preset::Frost => "Frost",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "Auto" => Some(Preset::Auto),
            "High" => Some(Preset::High),
            "Medium" => Some(Preset::Medium),
            "Low" => Some(Preset::Low),
            "Party" => Some(Preset::Party),
            "Away" => Some(Preset::Away),
            "Frost" => Some(Preset::Frost),
            _ => None,
        }
    }

    /// Party and Away are timed and need a two-digit duration appended.
    pub fn requires_duration(&self) -> bool {
        matches!(self, Preset::Party | Preset::Away)
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const SEVEN_PRESETS: [Preset; 7] = [
    Preset::Auto,
    Preset::High,
    Preset::Medium,
    Preset::Low,
    Preset::Party,
    Preset::Away,
    Preset::Frost,
];

const SIX_PRESETS: [Preset; 6] = [
    Preset::Auto,
    Preset::High,
    Preset::Medium,
    Preset::Low,
    Preset::Party,
    Preset::Frost,
];

// Indices 1..=3 are Auto High/Medium/Low; the second half repeats the
// first for thermostats reporting from the secondary schedule.
const SEVEN_PRESET_MODES: [Mode; 26] = [
    Mode::Offline,
    Mode::Auto,
    Mode::Auto,
    Mode::Auto,
    Mode::High,
    Mode::Medium,
    Mode::Low,
    Mode::Party,
    Mode::Away,
    Mode::Frost,
    Mode::On,
    Mode::On,
    Mode::Undefined,
    Mode::Undefined,
    Mode::Undefined,
    Mode::Undefined,
    Mode::Offline,
    Mode::Auto,
    Mode::Auto,
    Mode::Auto,
    Mode::High,
    Mode::Medium,
    Mode::Low,
    Mode::Party,
    Mode::Frost,
    Mode::On,
];

const SIX_PRESET_MODES: [Mode; 25] = [
    Mode::Offline,
    Mode::Auto,
    Mode::Auto,
    Mode::Auto,
    Mode::High,
    Mode::Medium,
    Mode::Low,
    Mode::Party,
    Mode::Frost,
    Mode::On,
    Mode::On,
    Mode::Undefined,
    Mode::Undefined,
    Mode::Undefined,
    Mode::Undefined,
    Mode::Offline,
    Mode::Auto,
    Mode::Auto,
    Mode::Auto,
    Mode::High,
    Mode::Medium,
    Mode::Low,
    Mode::Party,
    Mode::Frost,
    Mode::On,
];

/// Gateway firmware generation. The preset vocabulary and mode table differ
/// between the two and their offsets are not interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ProtocolRevision {
    SixPreset,
    #[default]
    SevenPreset,
}

impl ProtocolRevision {
    pub fn presets(&self) -> &'static [Preset] {
        match self {
            ProtocolRevision::SixPreset => &SIX_PRESETS,
            ProtocolRevision::SevenPreset => &SEVEN_PRESETS,
        }
    }

    pub fn modes(&self) -> &'static [Mode] {
        match self {
            ProtocolRevision::SixPreset => &SIX_PRESET_MODES,
            ProtocolRevision::SevenPreset => &SEVEN_PRESET_MODES,
        }
    }

    /// Highest mode index that still counts as "off".
    pub fn last_off_index(&self) -> usize {
        match self {
            ProtocolRevision::SixPreset => 8,
            ProtocolRevision::SevenPreset => 9,
        }
    }

    pub fn preset_index(&self, preset: Preset) -> Option<usize> {
        self.presets().iter().position(|p| *p == preset)
    }
}

/// One physical controller unit and the thermostats it reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gateway {
    pub id: String,
    pub name: String,
    pub thermostats: Vec<Thermostat>,
}

impl Gateway {
    pub fn thermostat(&self, id: &str) -> Option<&Thermostat> {
        self.thermostats.iter().find(|t| t.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thermostat {
    pub id: String,
    pub name: String,
    pub on: bool,
    pub mode: Mode,
    pub current_temperature: Temperature,
    pub target_temperature: Temperature,
}

impl Thermostat {
    pub fn mode_name(&self) -> &'static str {
        self.mode.name()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotWater {
    pub id: String,
    pub on: bool,
}
