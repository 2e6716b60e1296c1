//! Refresh cadence presets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How often the station is polled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RefreshInterval {
    OneMinute,
    #[default]
    FiveMinutes,
    TenMinutes,
    ThirtyMinutes,
    OneHour,
}

impl RefreshInterval {
    pub const ALL: [RefreshInterval; 5] = [
        RefreshInterval::OneMinute,
        RefreshInterval::FiveMinutes,
        RefreshInterval::TenMinutes,
        RefreshInterval::ThirtyMinutes,
        RefreshInterval::OneHour,
    ];

    pub fn minutes(&self) -> u64 {
        match self {
            Self::OneMinute => 1,
            Self::FiveMinutes => 5,
            Self::TenMinutes => 10,
            Self::ThirtyMinutes => 30,
            Self::OneHour => 60,
        }
    }

    pub fn from_minutes(minutes: u64) -> Option<Self> {
        Self::ALL.iter().copied().find(|i| i.minutes() == minutes)
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.minutes() * 60)
    }
}

impl fmt::Display for RefreshInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneHour => f.write_str("1 hour"),
            Self::OneMinute => f.write_str("1 minute"),
            other => write!(f, "{} minutes", other.minutes()),
        }
    }
}
