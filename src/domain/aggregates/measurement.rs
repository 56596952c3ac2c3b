//! Measurement Session Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::error::MarketplaceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus { Created, InProgress, Completed, Failed, Expired }

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool { matches!(self, Self::Failed | Self::Expired) }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for SessionStatus {
    type Err = MarketplaceError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "expired" => Ok(Self::Expired),
            other => Err(MarketplaceError::invalid("status", format!("unknown session status '{other}'"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementUnit { Cm, In }

/// The full set of body measurements a tailor needs to cut a suit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BodyMeasurements {
    #[validate(range(min = 1.0, max = 300.0))]
    pub chest: f64,
    #[validate(range(min = 1.0, max = 300.0))]
    pub waist: f64,
    #[validate(range(min = 1.0, max = 300.0))]
    pub hips: f64,
    #[validate(range(min = 1.0, max = 300.0))]
    pub shoulder_width: f64,
    #[validate(range(min = 1.0, max = 300.0))]
    pub sleeve_length: f64,
    #[validate(range(min = 1.0, max = 300.0))]
    pub jacket_length: f64,
    #[validate(range(min = 1.0, max = 300.0))]
    pub neck: f64,
    #[validate(range(min = 1.0, max = 300.0))]
    pub inseam: f64,
    #[validate(range(min = 1.0, max = 300.0))]
    pub outseam: f64,
    #[validate(range(min = 1.0, max = 300.0))]
    pub thigh: f64,
    pub unit: MeasurementUnit,
    #[validate(range(min = 0.0, max = 1.0))]
    pub confidence: f64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: Option<Uuid>,
    pub status: SessionStatus,
    pub measurements: Option<BodyMeasurements>,
    pub provider: String,
    #[serde(skip)]
    pub provider_ref: Option<String>,
    pub mobile_url: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MeasurementSession {
    pub fn new(user_id: Uuid, order_id: Option<Uuid>, provider: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), user_id, order_id, status: SessionStatus::Created, measurements: None,
            provider: provider.to_string(), provider_ref: None, mobile_url: None, completed_at: None,
            created_at: now, updated_at: now,
        }
    }

    pub fn ensure_owned_by(&self, user_id: Uuid) -> Result<(), MarketplaceError> {
        if self.user_id != user_id { return Err(MarketplaceError::Forbidden); }
        Ok(())
    }

    /// Only an exactly-completed session satisfies the checkout gate.
    pub fn satisfies_checkout(&self) -> bool { self.status == SessionStatus::Completed }

    pub fn start(&mut self) -> Result<(), MarketplaceError> {
        match self.status {
            SessionStatus::Created => { self.status = SessionStatus::InProgress; self.touch(); Ok(()) }
            SessionStatus::InProgress => Ok(()),
            other => Err(self.transition_error(other, SessionStatus::InProgress)),
        }
    }

    /// Stores a full payload and marks the session completed.
    ///
    /// Re-submitting on a completed session replaces the measurements.
    pub fn complete(&mut self, measurements: BodyMeasurements) -> Result<(), MarketplaceError> {
        if self.status.is_terminal() { return Err(self.transition_error(self.status, SessionStatus::Completed)); }
        measurements.validate()?;
        let now = Utc::now();
        self.measurements = Some(measurements);
        self.status = SessionStatus::Completed;
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn fail(&mut self) {
        if self.status != SessionStatus::Completed { self.status = SessionStatus::Failed; self.touch(); }
    }

    pub fn expire(&mut self) {
        if self.status != SessionStatus::Completed { self.status = SessionStatus::Expired; self.touch(); }
    }

    fn transition_error(&self, from: SessionStatus, to: SessionStatus) -> MarketplaceError {
        MarketplaceError::Conflict { message: format!("measurement session cannot move from {from} to {to}"), existing_item_id: None }
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[cfg(test)]
pub(crate) fn sample_measurements() -> BodyMeasurements {
    BodyMeasurements {
        chest: 102.0, waist: 88.0, hips: 100.0, shoulder_width: 46.0, sleeve_length: 64.0,
        jacket_length: 76.0, neck: 40.0, inseam: 82.0, outseam: 106.0, thigh: 58.0,
        unit: MeasurementUnit::Cm, confidence: 0.93,
    }
}
