use serde::{Deserialize, Serialize};

/// Post-exercise self rating used for progression guidance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum EffortLevel {
    Easy,
    Normal,
    Hard,
}

impl EffortLevel {
    pub const ALL: [EffortLevel; 3] = [EffortLevel::Easy, EffortLevel::Normal, EffortLevel::Hard];

    pub fn raw(&self) -> i64 {
        match self {
            EffortLevel::Easy => 1,
            EffortLevel::Normal => 2,
            EffortLevel::Hard => 3,
        }
    }

    pub fn from_raw(value: i64) -> Option<Self> {
        match value {
            1 => Some(EffortLevel::Easy),
            2 => Some(EffortLevel::Normal),
            3 => Some(EffortLevel::Hard),
            _ => None,
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            EffortLevel::Easy => "Increase the weight",
            EffortLevel::Normal => "Working weight",
            EffortLevel::Hard => "At the limit",
        }
    }
}
