//! Command catalogue

use std::fmt;
use std::str::FromStr;

/// Every command the equalizer host understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    HealthCheck,
    GetEnable,
    SetEnable,
    SetAutoPreAmp,
    GetPreAmp,
    SetPreAmp,
    GetFilterGain,
    SetFilterGain,
    GetFilterFrequency,
    SetFilterFrequency,
    GetFilterQuality,
    SetFilterQuality,
    GetFilterType,
    SetFilterType,
    GetFilterCount,
    AddFilter,
    RemoveFilter,
}

impl Command {
    pub const ALL: [Command; 17] = [
        Command::HealthCheck,
        Command::GetEnable,
        Command::SetEnable,
        Command::SetAutoPreAmp,
        Command::GetPreAmp,
        Command::SetPreAmp,
        Command::GetFilterGain,
        Command::SetFilterGain,
        Command::GetFilterFrequency,
        Command::SetFilterFrequency,
        Command::GetFilterQuality,
        Command::SetFilterQuality,
        Command::GetFilterType,
        Command::SetFilterType,
        Command::GetFilterCount,
        Command::AddFilter,
        Command::RemoveFilter,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Command::HealthCheck => "healthCheck",
            Command::GetEnable => "getEnable",
            Command::SetEnable => "setEnable",
            Command::SetAutoPreAmp => "setAutoPreAmp",
            Command::GetPreAmp => "getPreamp",
            Command::SetPreAmp => "setPreamp",
            Command::GetFilterGain => "getFilterGain",
            Command::SetFilterGain => "setFilterGain",
            Command::GetFilterFrequency => "getFilterFrequency",
            Command::SetFilterFrequency => "setFilterFrequency",
            Command::GetFilterQuality => "getFilterQuality",
            Command::SetFilterQuality => "setFilterQuality",
            Command::GetFilterType => "getFilterType",
            Command::SetFilterType => "setFilterType",
            Command::GetFilterCount => "getFilterCount",
            Command::AddFilter => "addFilter",
            Command::RemoveFilter => "removeFilter",
        }
    }

    /// Commands addressed to a single band by slot index
    pub fn is_per_band(self) -> bool {
        matches!(
            self,
            Command::GetFilterGain
                | Command::SetFilterGain
                | Command::GetFilterFrequency
                | Command::SetFilterFrequency
                | Command::GetFilterQuality
                | Command::SetFilterQuality
                | Command::GetFilterType
                | Command::SetFilterType
                | Command::RemoveFilter
        )
    }

    /// Wire channel name; per-band commands carry the index as a suffix
    /// (`setFilterGain:3`) so concurrent replies stay distinguishable in logs
    pub fn channel(self, index: Option<usize>) -> String {
        match index {
            Some(i) if self.is_per_band() => format!("{}:{}", self.as_str(), i),
            _ => self.as_str().to_string(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.split(':').next().unwrap_or_default();
        Command::ALL
            .into_iter()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| format!("Unknown command: {}", s))
    }
}
