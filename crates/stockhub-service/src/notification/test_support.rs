//! In-memory doubles for the store and bus, used by service tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use stockhub_core::error::AppError;
use stockhub_core::result::AppResult;
use stockhub_core::types::id::{NotificationId, TenantId, UserId};
use stockhub_core::types::pagination::{PageRequest, PageResponse};
use stockhub_entity::notification::{Notification, NotificationFilter, UnreadCounts};
use stockhub_realtime::bridge::NotificationBus;
use stockhub_realtime::message::envelope::FanoutEnvelope;

use super::store::NotificationStore;

/// In-memory store with the same visibility and read-state semantics as
/// the SQL repository.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Notification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.rows.lock().unwrap().clone()
    }

    pub fn get(&self, id: NotificationId) -> Option<Notification> {
        self.rows.lock().unwrap().iter().find(|n| n.id == id).cloned()
    }

    fn visible(n: &Notification, tenant_id: TenantId, user_id: UserId) -> bool {
        n.tenant_id == tenant_id
            && (n.user_id == Some(user_id) || n.user_id.is_none())
            && !n.is_expired_at(Utc::now())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert(&self, notification: &Notification) -> AppResult<()> {
        self.rows.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn insert_many(&self, notifications: &[Notification]) -> AppResult<()> {
        self.rows.lock().unwrap().extend_from_slice(notifications);
        Ok(())
    }

    async fn find_for_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        filter: &NotificationFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Notification>> {
        let rows = self.rows.lock().unwrap();
        let mut matched: Vec<Notification> = rows
            .iter()
            .filter(|n| Self::visible(n, tenant_id, user_id))
            .filter(|n| !filter.unread_only || n.is_unread())
            .filter(|n| filter.kind.map_or(true, |k| n.kind == k))
            .filter(|n| filter.created_after.map_or(true, |t| n.created_at >= t))
            .filter(|n| filter.created_before.map_or(true, |t| n.created_at <= t))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok(PageResponse::new(items, page.page, page.page_size, total))
    }

    async fn mark_read(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        notification_id: NotificationId,
    ) -> AppResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        for n in rows.iter_mut() {
            if n.id == notification_id
                && n.tenant_id == tenant_id
                && (n.user_id == Some(user_id) || n.user_id.is_none())
                && n.is_unread()
            {
                n.is_read = true;
                n.read_at = Some(Utc::now());
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn mark_all_read(&self, tenant_id: TenantId, user_id: UserId) -> AppResult<u64> {
        let mut rows = self.rows.lock().unwrap();
        let mut marked = 0;
        for n in rows.iter_mut() {
            if n.tenant_id == tenant_id
                && (n.user_id == Some(user_id) || n.user_id.is_none())
                && n.is_unread()
            {
                n.is_read = true;
                n.read_at = Some(Utc::now());
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn count_unread(&self, tenant_id: TenantId, user_id: UserId) -> AppResult<UnreadCounts> {
        let rows = self.rows.lock().unwrap();
        let mut counts = UnreadCounts::default();
        for n in rows.iter() {
            if !Self::visible(n, tenant_id, user_id) || n.is_read {
                continue;
            }
            counts.total += 1;
            *counts.by_kind.entry(n.kind.as_str().to_string()).or_insert(0) += 1;
            match n.priority.as_str() {
                "high" => counts.high_priority += 1,
                "urgent" => counts.urgent += 1,
                _ => {}
            }
        }
        Ok(counts)
    }

    async fn delete_expired(&self) -> AppResult<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        let now = Utc::now();
        rows.retain(|n| !n.is_expired_at(now));
        Ok((before - rows.len()) as u64)
    }
}

/// Store that refuses every operation.
#[derive(Debug)]
pub struct FailingStore;

#[async_trait]
impl NotificationStore for FailingStore {
    async fn insert(&self, _: &Notification) -> AppResult<()> {
        Err(AppError::database("store offline"))
    }

    async fn insert_many(&self, _: &[Notification]) -> AppResult<()> {
        Err(AppError::database("store offline"))
    }

    async fn find_for_user(
        &self,
        _: TenantId,
        _: UserId,
        _: &NotificationFilter,
        _: &PageRequest,
    ) -> AppResult<PageResponse<Notification>> {
        Err(AppError::database("store offline"))
    }

    async fn mark_read(&self, _: TenantId, _: UserId, _: NotificationId) -> AppResult<bool> {
        Err(AppError::database("store offline"))
    }

    async fn mark_all_read(&self, _: TenantId, _: UserId) -> AppResult<u64> {
        Err(AppError::database("store offline"))
    }

    async fn count_unread(&self, _: TenantId, _: UserId) -> AppResult<UnreadCounts> {
        Err(AppError::database("store offline"))
    }

    async fn delete_expired(&self) -> AppResult<u64> {
        Err(AppError::database("store offline"))
    }
}

/// Bus that records every published envelope.
#[derive(Debug, Default)]
pub struct RecordingBus {
    published: Mutex<Vec<FanoutEnvelope>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<FanoutEnvelope> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationBus for RecordingBus {
    async fn publish(&self, envelope: &FanoutEnvelope) -> AppResult<()> {
        self.published.lock().unwrap().push(envelope.clone());
        Ok(())
    }
}

/// Bus whose publish always fails.
#[derive(Debug)]
pub struct FailingBus;

#[async_trait]
impl NotificationBus for FailingBus {
    async fn publish(&self, _: &FanoutEnvelope) -> AppResult<()> {
        Err(AppError::bus("bus offline"))
    }
}
