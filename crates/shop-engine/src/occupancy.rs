//! 資源佔用行事曆
//!
//! 同一資源上的佔用不得互相重疊；「重疊」的定義由 [`Occupancy`] 決定。
//! 外部服務時段使用半開時間區間，車輛佔用則是任兩筆皆視為重疊。

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shop_core::{EvaluationId, Result, ShopError, SlotId, TimeInterval};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// 佔用：可判斷兩筆是否衝突
pub trait Occupancy: Clone + fmt::Debug + Send + Sync {
    /// 兩筆佔用是否重疊
    fn overlaps(&self, other: &Self) -> bool;

    /// 佔用本身是否有效
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

impl Occupancy for TimeInterval {
    fn overlaps(&self, other: &Self) -> bool {
        TimeInterval::overlaps(self, other)
    }

    fn validate(&self) -> Result<()> {
        TimeInterval::validate(self)
    }
}

/// 評估單對車輛的佔用
///
/// 與時間無關：同一車輛的任兩筆佔用一律重疊。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationClaim {
    pub evaluation_id: EvaluationId,
}

impl Occupancy for EvaluationClaim {
    fn overlaps(&self, _other: &Self) -> bool {
        true
    }
}

/// 已登記的佔用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking<K, O> {
    pub id: SlotId,
    pub resource: K,
    pub occupancy: O,
}

/// 預檢結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proposal {
    Accepted,
    Conflict { with: SlotId },
}

impl Proposal {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Proposal::Accepted)
    }
}

/// 登記結果
#[derive(Debug, Clone, PartialEq)]
pub enum Commit<K, O> {
    Committed(Booking<K, O>),
    Conflict(Booking<K, O>),
}

/// 依資源分鎖的佔用行事曆
#[derive(Debug)]
pub struct OccupancyCalendar<K, O>
where
    K: Eq + Hash,
{
    resources: DashMap<K, Arc<Mutex<Vec<Booking<K, O>>>>>,
    index: DashMap<SlotId, K>,
}

impl<K, O> Default for OccupancyCalendar<K, O>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            resources: DashMap::new(),
            index: DashMap::new(),
        }
    }
}

impl<K, O> OccupancyCalendar<K, O>
where
    K: Eq + Hash + Clone + fmt::Display,
    O: Occupancy,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn bookings_of(&self, resource: &K) -> Arc<Mutex<Vec<Booking<K, O>>>> {
        Arc::clone(self.resources.entry(resource.clone()).or_default().value())
    }

    fn resource_of(&self, slot_id: SlotId) -> Result<K> {
        self.index
            .get(&slot_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ShopError::not_found("預約時段", slot_id))
    }

    fn find_conflict(
        bookings: &[Booking<K, O>],
        occupancy: &O,
        exclude: Option<SlotId>,
    ) -> Option<SlotId> {
        bookings
            .iter()
            .filter(|b| Some(b.id) != exclude)
            .find(|b| b.occupancy.overlaps(occupancy))
            .map(|b| b.id)
    }

    fn conflict_error(resource: &K, with: SlotId) -> ShopError {
        ShopError::SlotConflict {
            resource: resource.to_string(),
            with,
        }
    }

    /// 預檢：不修改任何狀態
    pub fn propose(
        &self,
        resource: &K,
        occupancy: &O,
        exclude: Option<SlotId>,
    ) -> Result<Proposal> {
        occupancy.validate()?;

        let Some(bookings) = self.resources.get(resource).map(|e| Arc::clone(e.value())) else {
            return Ok(Proposal::Accepted);
        };
        let bookings = bookings.lock();

        Ok(match Self::find_conflict(&bookings, occupancy, exclude) {
            Some(with) => {
                tracing::debug!("資源 {} 佔用衝突：{}", resource, with);
                Proposal::Conflict { with }
            }
            None => Proposal::Accepted,
        })
    }

    /// 檢查後登記（同一把鎖內完成）
    pub fn commit(&self, resource: &K, occupancy: O) -> Result<Booking<K, O>> {
        match self.try_commit(resource, occupancy)? {
            Commit::Committed(booking) => Ok(booking),
            Commit::Conflict(existing) => Err(Self::conflict_error(resource, existing.id)),
        }
    }

    /// 檢查後登記；衝突時回傳鎖內讀到的既有佔用
    pub fn try_commit(&self, resource: &K, occupancy: O) -> Result<Commit<K, O>> {
        occupancy.validate()?;

        let bookings = self.bookings_of(resource);
        let mut bookings = bookings.lock();

        if let Some(existing) = bookings.iter().find(|b| b.occupancy.overlaps(&occupancy)) {
            return Ok(Commit::Conflict(existing.clone()));
        }

        let booking = Booking {
            id: SlotId::new(),
            resource: resource.clone(),
            occupancy,
        };
        self.index.insert(booking.id, resource.clone());
        bookings.push(booking.clone());

        tracing::debug!("資源 {} 登記佔用 {}", resource, booking.id);
        Ok(Commit::Committed(booking))
    }

    /// 移除佔用
    pub fn remove(&self, slot_id: SlotId) -> Result<Booking<K, O>> {
        let resource = self.resource_of(slot_id)?;
        let bookings = self.bookings_of(&resource);
        let mut bookings = bookings.lock();

        let position = bookings
            .iter()
            .position(|b| b.id == slot_id)
            .ok_or_else(|| ShopError::not_found("預約時段", slot_id))?;
        let booking = bookings.remove(position);
        self.index.remove(&slot_id);

        tracing::debug!("資源 {} 移除佔用 {}", resource, slot_id);
        Ok(booking)
    }

    /// 移動／調整佔用，與同資源的其他所有佔用重新比對
    pub fn reschedule(&self, slot_id: SlotId, occupancy: O) -> Result<Booking<K, O>> {
        occupancy.validate()?;

        let resource = self.resource_of(slot_id)?;
        let bookings = self.bookings_of(&resource);
        let mut bookings = bookings.lock();

        if let Some(with) = Self::find_conflict(&bookings, &occupancy, Some(slot_id)) {
            return Err(Self::conflict_error(&resource, with));
        }

        let booking = bookings
            .iter_mut()
            .find(|b| b.id == slot_id)
            .ok_or_else(|| ShopError::not_found("預約時段", slot_id))?;
        booking.occupancy = occupancy;
        Ok(booking.clone())
    }

    pub fn get(&self, slot_id: SlotId) -> Result<Booking<K, O>> {
        let resource = self.resource_of(slot_id)?;
        let bookings = self.bookings_of(&resource);
        let bookings = bookings.lock();
        bookings
            .iter()
            .find(|b| b.id == slot_id)
            .cloned()
            .ok_or_else(|| ShopError::not_found("預約時段", slot_id))
    }

    /// 資源上的所有佔用（登記順序）
    pub fn bookings(&self, resource: &K) -> Vec<Booking<K, O>> {
        let Some(bookings) = self.resources.get(resource).map(|e| Arc::clone(e.value())) else {
            return Vec::new();
        };
        let bookings = bookings.lock().clone();
        bookings
    }
}
