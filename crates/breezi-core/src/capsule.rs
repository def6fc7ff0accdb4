//! Time capsules: a diary entry sealed until its open date.
//!
//! Eligibility compares LOCAL calendar days, never UTC instants: a capsule
//! opening "2026-09-01" becomes openable the moment the user's clock enters
//! that day. Callers resolve "today" with [`local_day_floor`] and pass the
//! resulting `NaiveDate`, so the policy lives in one place.

use crate::error::CoreError;
use crate::memory::{keys, KvStore};
use crate::shared::{DiaryEntry, TimeCapsule};
use chrono::{DateTime, Local, NaiveDate, Utc};

/// Truncates an instant to the local calendar day.
pub fn local_day_floor(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&Local).date_naive()
}

/// Days remaining until the capsule can open. Zero or negative means
/// openable today.
pub fn days_until_open(capsule: &TimeCapsule, today: NaiveDate) -> i64 {
    (capsule.open_date - today).num_days()
}

pub fn can_open(capsule: &TimeCapsule, today: NaiveDate) -> bool {
    days_until_open(capsule, today) <= 0
}

pub struct TimeCapsuleScheduler {
    store: KvStore,
}

impl TimeCapsuleScheduler {
    pub fn new(store: KvStore) -> Self {
        Self { store }
    }

    /// Seals a capsule over an existing diary entry.
    pub fn create(
        &self,
        user_id: &str,
        diary_date: NaiveDate,
        open_date: NaiveDate,
    ) -> Result<TimeCapsule, CoreError> {
        if !self.store.exists(&keys::diary(user_id, &diary_date))? {
            return Err(CoreError::NotFound(format!(
                "diary {} for user {}",
                diary_date, user_id
            )));
        }
        if open_date <= diary_date {
            return Err(CoreError::Validation(
                "open date must be after the diary date".to_string(),
            ));
        }
        let capsule = TimeCapsule {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            diary_date,
            open_date,
            created_at: Utc::now(),
            is_open: false,
        };
        self.store.set(&keys::capsule(user_id, &capsule.id), &capsule)?;
        tracing::info!(target: "breezi::capsule", %user_id, open_date = %open_date, "capsule sealed");
        Ok(capsule)
    }

    /// All of a user's capsules, soonest-opening first.
    pub fn list(&self, user_id: &str) -> Result<Vec<TimeCapsule>, CoreError> {
        let mut capsules: Vec<TimeCapsule> =
            self.store.get_by_prefix(&keys::capsule_prefix(user_id))?;
        capsules.sort_by(|a, b| a.open_date.cmp(&b.open_date));
        Ok(capsules)
    }

    /// Opens a capsule exactly once and returns the sealed diary entry.
    /// `NotYetEligible` before the open date, `AlreadyOpen` on the second
    /// attempt.
    pub fn open(
        &self,
        user_id: &str,
        capsule_id: &str,
        today: NaiveDate,
    ) -> Result<(TimeCapsule, DiaryEntry), CoreError> {
        let key = keys::capsule(user_id, capsule_id);
        let capsule = self
            .store
            .update::<TimeCapsule, _>(&key, |current| {
                let c = current
                    .ok_or_else(|| CoreError::NotFound(format!("capsule {}", capsule_id)))?;
                if c.is_open {
                    return Err(CoreError::AlreadyOpen);
                }
                if !can_open(&c, today) {
                    return Err(CoreError::NotYetEligible);
                }
                Ok(Some(TimeCapsule { is_open: true, ..c }))
            })?
            .ok_or_else(|| CoreError::Storage("capsule update aborted".to_string()))?;

        let entry = self
            .store
            .get::<DiaryEntry>(&keys::diary(user_id, &capsule.diary_date))?
            .ok_or_else(|| {
                CoreError::NotFound(format!("diary {} for capsule", capsule.diary_date))
            })?;
        tracing::info!(target: "breezi::capsule", %user_id, capsule_id, "capsule opened");
        Ok((capsule, entry))
    }
}
