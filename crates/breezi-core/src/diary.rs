//! Diary entries: one per user per calendar day, upsert semantics.

use crate::capsule::TimeCapsuleScheduler;
use crate::error::CoreError;
use crate::memory::{keys, KvStore};
use crate::shared::{DiaryEntry, TimeCapsule};
use chrono::{NaiveDate, Utc};

pub struct DiaryService {
    store: KvStore,
}

impl DiaryService {
    pub fn new(store: KvStore) -> Self {
        Self { store }
    }

    /// Saves (or overwrites) the entry for the given day. When `capsule_open_date`
    /// is set, also seals the entry in a time capsule.
    pub fn save_entry(
        &self,
        user_id: &str,
        date: NaiveDate,
        title: &str,
        content: &str,
        emotion: &str,
        compliment: Option<&str>,
        regrets: Option<&str>,
        capsule_open_date: Option<NaiveDate>,
    ) -> Result<(DiaryEntry, Option<TimeCapsule>), CoreError> {
        if emotion.trim().is_empty() {
            return Err(CoreError::Validation("emotion required".to_string()));
        }
        let entry = DiaryEntry {
            user_id: user_id.to_string(),
            date,
            title: title.to_string(),
            content: content.to_string(),
            emotion: emotion.to_string(),
            compliment: compliment.map(str::to_string),
            regrets: regrets.map(str::to_string),
            created_at: Utc::now(),
        };
        self.store.set(&keys::diary(user_id, &date), &entry)?;
        tracing::info!(target: "breezi::diary", %user_id, date = %date, "diary entry saved");

        let capsule = match capsule_open_date {
            Some(open_date) => {
                Some(TimeCapsuleScheduler::new(self.store.clone()).create(user_id, date, open_date)?)
            }
            None => None,
        };
        Ok((entry, capsule))
    }

    pub fn get_entry(&self, user_id: &str, date: NaiveDate) -> Result<Option<DiaryEntry>, CoreError> {
        self.store.get(&keys::diary(user_id, &date))
    }

    /// All entries for a user, oldest first.
    pub fn list_entries(&self, user_id: &str) -> Result<Vec<DiaryEntry>, CoreError> {
        let mut entries: Vec<DiaryEntry> =
            self.store.get_by_prefix(&keys::diary_prefix(user_id))?;
        entries.sort_by_key(|e| e.date);
        Ok(entries)
    }

    pub fn delete_entry(&self, user_id: &str, date: NaiveDate) -> Result<(), CoreError> {
        self.store.del(&keys::diary(user_id, &date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_entry_per_day_upsert() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open_path(dir.path()).unwrap();
        let diary = DiaryService::new(store);

        let date = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        diary
            .save_entry("u1", date, "아침", "첫 버전", "sad", None, None, None)
            .unwrap();
        diary
            .save_entry("u1", date, "저녁", "수정 버전", "happy", Some("잘했어"), None, None)
            .unwrap();

        let entries = diary.list_entries("u1").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "저녁");
        assert_eq!(entries[0].emotion, "happy");
    }

    #[test]
    fn capsule_opt_in_seals_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open_path(dir.path()).unwrap();
        let diary = DiaryService::new(store);

        let date = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let open_date = NaiveDate::from_ymd_opt(2026, 12, 25).unwrap();
        let (_, capsule) = diary
            .save_entry("u1", date, "봉인", "미래에게", "happy", None, None, Some(open_date))
            .unwrap();
        let capsule = capsule.unwrap();
        assert_eq!(capsule.open_date, open_date);
        assert!(!capsule.is_open);
    }
}
