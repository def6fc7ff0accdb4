//! Sled-backed KV store: flat JSON records under string keys.
//!
//! Entities live under key prefixes (`profile:`, `report:`, `chatmsg:`, ...);
//! see the `keys` module for the full map. `update` is the only
//! read-modify-write primitive and goes through sled's compare-and-swap, so a
//! concurrent writer forces a re-read instead of a lost update. That makes a
//! single `update` atomic per key; it does NOT serialize multi-key flows —
//! callers needing strict exactly-once semantics across records (e.g. report
//! processing for one user) must serialize per user themselves.

use crate::error::CoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use std::path::Path;

/// Key prefixes and builders for every persisted entity.
pub mod keys {
    /// `profile:{user_id}` -> ModerationRecord
    pub fn profile(user_id: &str) -> String {
        format!("profile:{}", user_id)
    }
    /// `report:{report_id}` -> Report
    pub fn report(report_id: &str) -> String {
        format!("report:{}", report_id)
    }
    pub const REPORT_PREFIX: &str = "report:";
    /// `chatmsg:{user_id}:{room_id}:{message_id}` -> ChatMessage
    pub fn chat_message(user_id: &str, room_id: &str, message_id: &str) -> String {
        format!("chatmsg:{}:{}:{}", user_id, room_id, message_id)
    }
    pub fn chat_message_prefix(user_id: &str, room_id: &str) -> String {
        format!("chatmsg:{}:{}:", user_id, room_id)
    }
    /// `chatroom:{user_id}:{room_id}` -> ChatRoom
    pub fn chat_room(user_id: &str, room_id: &str) -> String {
        format!("chatroom:{}:{}", user_id, room_id)
    }
    pub fn chat_room_prefix(user_id: &str) -> String {
        format!("chatroom:{}:", user_id)
    }
    /// `diary:{user_id}:{YYYY-MM-DD}` -> DiaryEntry
    pub fn diary(user_id: &str, date: &chrono::NaiveDate) -> String {
        format!("diary:{}:{}", user_id, date)
    }
    pub fn diary_prefix(user_id: &str) -> String {
        format!("diary:{}:", user_id)
    }
    /// `capsule:{user_id}:{capsule_id}` -> TimeCapsule
    pub fn capsule(user_id: &str, capsule_id: &str) -> String {
        format!("capsule:{}:{}", user_id, capsule_id)
    }
    pub fn capsule_prefix(user_id: &str) -> String {
        format!("capsule:{}:", user_id)
    }
    /// `notification:{user_id}:{notification_id}` -> Notification
    pub fn notification(user_id: &str, notification_id: &str) -> String {
        format!("notification:{}:{}", user_id, notification_id)
    }
    pub fn notification_prefix(user_id: &str) -> String {
        format!("notification:{}:", user_id)
    }
    /// `withdrawal:{user_id}` -> WithdrawalRecord (1-year legal hold)
    pub fn withdrawal(user_id: &str) -> String {
        format!("withdrawal:{}", user_id)
    }
    pub const WITHDRAWAL_PREFIX: &str = "withdrawal:";
    /// `activitylog:{user_id}:{log_id}` -> ActivityLog
    pub fn activity_log_prefix(user_id: &str) -> String {
        format!("activitylog:{}:", user_id)
    }
    pub const ACTIVITY_LOG_PREFIX: &str = "activitylog:";
    /// `user_warnings:{user_id}` -> warning/suspension history entries
    pub fn user_warnings(user_id: &str) -> String {
        format!("user_warnings:{}", user_id)
    }
    /// `communitypost:{post_id}` / `communitycomment:{comment_id}` -> raw content
    pub fn community_post(post_id: &str) -> String {
        format!("communitypost:{}", post_id)
    }
    pub fn community_comment(comment_id: &str) -> String {
        format!("communitycomment:{}", comment_id)
    }
}

/// Typed JSON store over sled. Cheap to clone via `Db`'s internal Arc.
#[derive(Clone)]
pub struct KvStore {
    db: Db,
}

impl KvStore {
    /// Opens or creates the sled database at the given path.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CoreError> {
        match self.db.get(key.as_bytes())? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CoreError> {
        let raw = serde_json::to_vec(value)?;
        self.db.insert(key.as_bytes(), raw)?;
        Ok(())
    }

    pub fn del(&self, key: &str) -> Result<(), CoreError> {
        self.db.remove(key.as_bytes())?;
        Ok(())
    }

    pub fn exists(&self, key: &str) -> Result<bool, CoreError> {
        Ok(self.db.contains_key(key.as_bytes())?)
    }

    /// All values whose key starts with `prefix`, in key order.
    pub fn get_by_prefix<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>, CoreError> {
        let mut out = Vec::new();
        for item in self.db.scan_prefix(prefix.as_bytes()) {
            let (_, raw) = item?;
            out.push(serde_json::from_slice(&raw)?);
        }
        Ok(out)
    }

    /// All keys starting with `prefix` (for deletion passes).
    pub fn keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, CoreError> {
        let mut out = Vec::new();
        for item in self.db.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item?;
            out.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(out)
    }

    /// Compare-and-swap read-modify-write. `apply` receives the current value
    /// (None when absent) and returns the replacement; returning `None` keeps
    /// the current value untouched and aborts. Retries while another writer
    /// races the same key.
    pub fn update<T, F>(&self, key: &str, mut apply: F) -> Result<Option<T>, CoreError>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(Option<T>) -> Result<Option<T>, CoreError>,
    {
        loop {
            let old_raw = self.db.get(key.as_bytes())?;
            let current: Option<T> = match &old_raw {
                Some(raw) => Some(serde_json::from_slice(raw)?),
                None => None,
            };
            let next = match apply(current)? {
                Some(v) => v,
                None => return Ok(None),
            };
            let new_raw = serde_json::to_vec(&next)?;
            match self
                .db
                .compare_and_swap(key.as_bytes(), old_raw, Some(new_raw))?
            {
                Ok(()) => return Ok(Some(next)),
                Err(_cas) => {
                    tracing::debug!(target: "breezi::store", key, "CAS conflict, retrying");
                    continue;
                }
            }
        }
    }

    /// Flushes sled to disk. Called by the gateway on shutdown.
    pub fn flush(&self) -> Result<(), CoreError> {
        self.db.flush()?;
        Ok(())
    }
}
