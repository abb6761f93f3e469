// src/types.rs
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::acquisition::ConfigurationError;

/// One raw measurement: wall-clock seconds and volts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub timestamp: f64,
    pub value: f64,
}

/// A sample expressed relative to the session's time origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    pub elapsed: f64,
    pub value: f64,
}

impl Reading {
    pub fn from_sample(sample: Sample, origin: f64) -> Self {
        Self {
            elapsed: sample.timestamp - origin,
            value: sample.value,
        }
    }
}

// 采样间隔 (下拉框里的固定选项)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PollInterval {
    #[serde(rename = "10 ms")]
    Ms10,
    #[default]
    #[serde(rename = "100 ms")]
    Ms100,
    #[serde(rename = "500 ms")]
    Ms500,
    #[serde(rename = "1 s")]
    S1,
    #[serde(rename = "10 s")]
    S10,
}

impl PollInterval {
    pub const ALL: [PollInterval; 5] = [
        PollInterval::Ms10,
        PollInterval::Ms100,
        PollInterval::Ms500,
        PollInterval::S1,
        PollInterval::S10,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PollInterval::Ms10 => "10 ms",
            PollInterval::Ms100 => "100 ms",
            PollInterval::Ms500 => "500 ms",
            PollInterval::S1 => "1 s",
            PollInterval::S10 => "10 s",
        }
    }

    pub fn millis(self) -> u64 {
        match self {
            PollInterval::Ms10 => 10,
            PollInterval::Ms100 => 100,
            PollInterval::Ms500 => 500,
            PollInterval::S1 => 1_000,
            PollInterval::S10 => 10_000,
        }
    }

    pub fn period(self) -> Duration {
        Duration::from_millis(self.millis())
    }
}

impl fmt::Display for PollInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PollInterval {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        PollInterval::ALL
            .into_iter()
            .find(|interval| interval.label() == wanted)
            .ok_or_else(|| ConfigurationError::UnknownInterval(wanted.to_owned()))
    }
}

// 采集核心发给 GUI 的消息
#[derive(Clone, Debug, PartialEq)]
pub enum LoopEvent {
    Started {
        output: Option<PathBuf>,
        interval: PollInterval,
    },
    Reading(Reading),
    Stopped,
    InputsLocked(bool),
    Error(String),
}

// 仪器类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Synthetic,
    Hardware,
}
