use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The relationships tracked every day. Closed set, enumeration order is the
/// order used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Target {
    Wife,
    Son,
    Parents,
}

impl Target {
    pub const ALL: [Target; 3] = [Target::Wife, Target::Son, Target::Parents];

    pub fn label(self) -> &'static str {
        match self {
            Target::Wife => "Wife",
            Target::Son => "Son",
            Target::Parents => "Parents",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EmotionLog {
    pub has_negative_emotion: bool,
    #[serde(default)]
    pub negative_thought_count: u64,
    #[serde(default)]
    pub positive_thought_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// One log per target. Serialized as a map keyed by the target name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Targets {
    #[serde(rename = "Wife")]
    pub wife: EmotionLog,
    #[serde(rename = "Son")]
    pub son: EmotionLog,
    #[serde(rename = "Parents")]
    pub parents: EmotionLog,
}

impl Targets {
    pub fn get(&self, target: Target) -> &EmotionLog {
        match target {
            Target::Wife => &self.wife,
            Target::Son => &self.son,
            Target::Parents => &self.parents,
        }
    }

    pub fn get_mut(&mut self, target: Target) -> &mut EmotionLog {
        match target {
            Target::Wife => &mut self.wife,
            Target::Son => &mut self.son,
            Target::Parents => &mut self.parents,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Target, &EmotionLog)> {
        Target::ALL.into_iter().map(move |target| (target, self.get(target)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub date: String,
    pub targets: Targets,
    #[serde(default)]
    pub reflection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_advice: Option<String>,
}

/// The whole persisted store, keyed by `YYYY-MM-DD`. A `BTreeMap` keeps the
/// keys in chronological order since the key format sorts lexicographically.
pub type Records = BTreeMap<String, DailyRecord>;

impl DailyRecord {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            targets: Targets::default(),
            reflection: String::new(),
            ai_advice: None,
        }
    }
}

// The update helpers take the record by reference and hand back an updated
// clone; the caller decides whether to persist it.

pub fn make_initial_record(date: &str) -> DailyRecord {
    DailyRecord::new(date)
}

pub fn set_verdict(record: &DailyRecord, target: Target, has_negative_emotion: bool) -> DailyRecord {
    let mut next = record.clone();
    next.targets.get_mut(target).has_negative_emotion = has_negative_emotion;
    next
}

/// Applies both deltas, clamping each count at zero on its own.
pub fn adjust_counts(
    record: &DailyRecord,
    target: Target,
    delta_positive: i64,
    delta_negative: i64,
) -> DailyRecord {
    let mut next = record.clone();
    let log = next.targets.get_mut(target);
    log.positive_thought_count = log.positive_thought_count.saturating_add_signed(delta_positive);
    log.negative_thought_count = log.negative_thought_count.saturating_add_signed(delta_negative);
    next
}

pub fn set_note(record: &DailyRecord, target: Target, note: Option<String>) -> DailyRecord {
    let mut next = record.clone();
    next.targets.get_mut(target).note = note.filter(|text| !text.trim().is_empty());
    next
}

pub fn set_reflection(record: &DailyRecord, text: impl Into<String>) -> DailyRecord {
    DailyRecord {
        reflection: text.into(),
        ..record.clone()
    }
}

pub fn set_advice(record: &DailyRecord, text: impl Into<String>) -> DailyRecord {
    DailyRecord {
        ai_advice: Some(text.into()),
        ..record.clone()
    }
}

/// True for a real calendar date already written as zero-padded `YYYY-MM-DD`.
pub fn is_valid_date_key(key: &str) -> bool {
    match NaiveDate::parse_from_str(key, "%Y-%m-%d") {
        Ok(date) => date.format("%Y-%m-%d").to_string() == key,
        Err(_) => false,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictRequest {
    pub target: Target,
    pub has_negative_emotion: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtsRequest {
    pub target: Target,
    #[serde(default)]
    pub delta_positive: i64,
    #[serde(default)]
    pub delta_negative: i64,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub target: Target,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReflectionRequest {
    pub reflection: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct AdviceRequest {
    #[serde(default)]
    pub reflection: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: String,
    pub positive_sum: u128,
    pub negative_sum: u128,
    pub agitated: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetTotals {
    pub target: Target,
    pub agitated_days: u64,
    pub peaceful_days: u64,
    pub total_days: u64,
    pub thoughts: u128,
    pub positive_thoughts: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub trend: Vec<TrendPoint>,
    pub targets: Vec<TargetTotals>,
    pub peace_rate: u64,
    pub wholesome_ratio: u64,
    pub total_thoughts: u128,
    pub days_recorded: u64,
}
