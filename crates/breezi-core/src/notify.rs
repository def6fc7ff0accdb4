//! In-app notification queue backed by the shared [`KvStore`].

use crate::error::CoreError;
use crate::memory::{keys, KvStore};
use crate::shared::{Notification, NotificationKind, TargetType};
use chrono::Utc;

#[derive(Clone)]
pub struct NotificationQueue {
    store: KvStore,
}

impl NotificationQueue {
    pub fn new(store: KvStore) -> Self {
        Self { store }
    }

    /// Stores a notification for the user and returns its id.
    pub fn enqueue(
        &self,
        user_id: &str,
        kind: NotificationKind,
        title: &str,
        message: &str,
        related_id: Option<&str>,
        related_type: Option<TargetType>,
    ) -> Result<String, CoreError> {
        let n = Notification {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind,
            title: title.to_string(),
            message: message.to_string(),
            is_read: false,
            created_at: Utc::now(),
            related_id: related_id.map(str::to_string),
            related_type,
        };
        self.store.set(&keys::notification(user_id, &n.id), &n)?;
        tracing::info!(target: "breezi::notify", %user_id, kind = ?n.kind, "notification enqueued");
        Ok(n.id)
    }

    /// All notifications for a user, newest first.
    pub fn list(&self, user_id: &str) -> Result<Vec<Notification>, CoreError> {
        let mut all: Vec<Notification> =
            self.store.get_by_prefix(&keys::notification_prefix(user_id))?;
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    pub fn mark_read(&self, user_id: &str, notification_id: &str) -> Result<(), CoreError> {
        let key = keys::notification(user_id, notification_id);
        self.store.update::<Notification, _>(&key, |existing| {
            let mut n = existing.ok_or_else(|| {
                CoreError::NotFound(format!("notification {}", notification_id))
            })?;
            n.is_read = true;
            Ok(Some(n))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_list_and_mark_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open_path(dir.path()).unwrap();
        let queue = NotificationQueue::new(store);

        let id = queue
            .enqueue("u1", NotificationKind::Warning, "경고", "내용", Some("r1"), Some(TargetType::Post))
            .unwrap();
        let list = queue.list("u1").unwrap();
        assert_eq!(list.len(), 1);
        assert!(!list[0].is_read);

        queue.mark_read("u1", &id).unwrap();
        assert!(queue.list("u1").unwrap()[0].is_read);
    }
}
