use chrono::{DateTime, Utc};
use gigboard_types::{ChatMessageId, DealId, NotificationId, ResponseId, TaskId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minor units per whole currency unit.
pub const BASE_UNIT: u64 = 100;

/// A monetary value in minor units.
///
/// All arithmetic is integer arithmetic; commission math stays exact
/// (5000 whole units at 10% commission nets exactly 4500). On the wire an
/// amount is a JSON number in whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn from_whole(units: u64) -> Self {
        Self(units * BASE_UNIT)
    }

    pub fn from_minor_units(units: u64) -> Self {
        Self(units)
    }

    /// Convert a decimal currency value, rejecting negatives and non-finite
    /// input.
    pub fn from_decimal(value: f64) -> Result<Self, String> {
        if !value.is_finite() {
            return Err("amount must be a finite number".to_string());
        }
        if value < 0.0 {
            return Err("amount must not be negative".to_string());
        }
        Ok(Self((value * BASE_UNIT as f64).round() as u64))
    }

    pub fn to_minor_units(&self) -> u64 {
        self.0
    }

    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / BASE_UNIT as f64
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn saturating_add(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(&self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Amount left after deducting a commission given in basis points.
    pub fn net_of_commission(&self, bps: u32) -> Self {
        let fee = self.0.saturating_mul(bps as u64) / 10_000;
        Self(self.0 - fee)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_decimal())
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if self.0 % BASE_UNIT == 0 {
            serializer.serialize_u64(self.0 / BASE_UNIT)
        } else {
            serializer.serialize_f64(self.to_decimal())
        }
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Amount::from_decimal(value).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub photo: Option<String>,
    pub balance: Amount,
    pub rating: f64,
    pub completed_tasks: u32,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A user as created on first authenticated contact.
    pub fn new(id: UserId, first_name: String, last_name: String, photo: Option<String>) -> Self {
        Self {
            id,
            first_name,
            last_name,
            photo,
            balance: Amount::ZERO,
            rating: 5.0,
            completed_tasks: 0,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Design,
    Development,
    Text,
    Marketing,
    Video,
    Audio,
}

impl FromStr for TaskCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "design" => Ok(Self::Design),
            "development" => Ok(Self::Development),
            "text" => Ok(Self::Text),
            "marketing" => Ok(Self::Marketing),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// Task lifecycle. Transitions are forward-only:
/// active -> in_progress -> completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Active,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub price: Amount,
    pub category: TaskCategory,
    pub client_id: UserId,
    pub status: TaskStatus,
    pub safe_deal: bool,
    pub responses: Vec<TaskResponse>,
    pub created_at: DateTime<Utc>,
    pub views: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: ResponseId,
    pub freelancer_id: UserId,
    pub message: String,
    pub proposed_price: Amount,
    pub created_at: DateTime<Utc>,
}

/// Deal lifecycle: in_progress -> completed. `Disputed` is modeled for the
/// wire contract but no operation produces it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    InProgress,
    Completed,
    Disputed,
}

impl FromStr for DealStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "disputed" => Ok(Self::Disputed),
            other => Err(format!("unknown deal status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: DealId,
    pub task_id: TaskId,
    pub task_title: String,
    pub client_id: UserId,
    pub freelancer_id: UserId,
    pub amount: Amount,
    pub status: DealStatus,
    pub commission: f64,
    pub progress: u8,
    pub messages: Vec<ChatMessage>,
    pub deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: ChatMessageId,
    pub sender_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewResponse,
    DealStarted,
    NewMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub payload: serde_json::Value,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// A task enriched for listings with the denormalized client record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub client: User,
    pub responses_count: usize,
}

/// A deal enriched with both denormalized participant records.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealView {
    #[serde(flatten)]
    pub deal: Deal,
    pub client: User,
    pub freelancer: User,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub completed_tasks: usize,
    pub rating: f64,
    pub balance: Amount,
    pub active_deals: usize,
}
