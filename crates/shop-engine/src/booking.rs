//! 預約行事曆
//!
//! - [`BookingCalendar`]：外部發布服務的時段，半開區間不得重疊
//! - [`VehicleOccupancy`]：每台車同時只能有一張未被拒絕的評估單

use chrono::NaiveDateTime;
use shop_core::{EvaluationId, ResourceId, Result, ShopError, SlotId, TimeInterval, VehicleId};

use crate::occupancy::{Booking, Commit, EvaluationClaim, OccupancyCalendar, Proposal};

/// 服務時段
pub type ServiceSlot = Booking<ResourceId, TimeInterval>;

/// 外部服務預約行事曆
#[derive(Debug, Default)]
pub struct BookingCalendar {
    slots: OccupancyCalendar<ResourceId, TimeInterval>,
}

impl BookingCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// 預檢時段，`exclude` 為編輯中的時段
    pub fn propose_slot(
        &self,
        resource: ResourceId,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude: Option<SlotId>,
    ) -> Result<Proposal> {
        self.slots
            .propose(&resource, &TimeInterval { start, end }, exclude)
    }

    /// 登記時段
    pub fn commit_slot(
        &self,
        resource: ResourceId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<ServiceSlot> {
        let slot = self.slots.commit(&resource, TimeInterval::new(start, end)?)?;
        tracing::info!("資源 {} 登記時段 {} ~ {}", resource, start, end);
        Ok(slot)
    }

    pub fn remove_slot(&self, slot_id: SlotId) -> Result<ServiceSlot> {
        self.slots.remove(slot_id)
    }

    /// 移動或調整時段長度
    pub fn move_slot(
        &self,
        slot_id: SlotId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<ServiceSlot> {
        let slot = self
            .slots
            .reschedule(slot_id, TimeInterval::new(start, end)?)?;
        tracing::info!("時段 {} 移至 {} ~ {}", slot_id, start, end);
        Ok(slot)
    }

    pub fn slot(&self, slot_id: SlotId) -> Result<ServiceSlot> {
        self.slots.get(slot_id)
    }

    /// 資源上的時段（依開始時間排序）
    pub fn slots(&self, resource: ResourceId) -> Vec<ServiceSlot> {
        let mut slots = self.slots.bookings(&resource);
        slots.sort_by_key(|s| s.occupancy.start);
        slots
    }
}

/// 車輛佔用（依評估單狀態，不看時間）
#[derive(Debug, Default)]
pub struct VehicleOccupancy {
    claims: OccupancyCalendar<VehicleId, EvaluationClaim>,
}

impl VehicleOccupancy {
    pub fn new() -> Self {
        Self::default()
    }

    /// 為評估單佔用車輛；已有佔用時回報 `VehicleBusy`
    pub fn claim(&self, vehicle_id: VehicleId, evaluation_id: EvaluationId) -> Result<SlotId> {
        match self
            .claims
            .try_commit(&vehicle_id, EvaluationClaim { evaluation_id })?
        {
            Commit::Committed(booking) => Ok(booking.id),
            Commit::Conflict(holder) => Err(ShopError::VehicleBusy {
                vehicle_id,
                evaluation_id: holder.occupancy.evaluation_id,
            }),
        }
    }

    /// 釋放車輛
    pub fn release(&self, claim_id: SlotId) -> Result<()> {
        self.claims.remove(claim_id).map(|_| ())
    }

    /// 目前佔用該車輛的評估單
    pub fn active_evaluation(&self, vehicle_id: VehicleId) -> Option<EvaluationId> {
        self.claims
            .bookings(&vehicle_id)
            .first()
            .map(|b| b.occupancy.evaluation_id)
    }

    pub fn is_busy(&self, vehicle_id: VehicleId) -> bool {
        self.active_evaluation(vehicle_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 7)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_service_slots_sorted_by_start() {
        let calendar = BookingCalendar::new();
        let resource = ResourceId::new();

        calendar.commit_slot(resource, at(14), at(15)).unwrap();
        calendar.commit_slot(resource, at(9), at(10)).unwrap();

        let slots = calendar.slots(resource);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].occupancy.start, at(9));
    }

    #[rstest]
    #[case::adjacent_before(7, 9, true)]
    #[case::adjacent_after(11, 12, true)]
    #[case::overlap_start(8, 10, false)]
    #[case::inside(9, 10, false)]
    #[case::covering(8, 12, false)]
    fn test_propose_against_existing_slot(
        #[case] start: u32,
        #[case] end: u32,
        #[case] accepted: bool,
    ) {
        let calendar = BookingCalendar::new();
        let resource = ResourceId::new();
        calendar.commit_slot(resource, at(9), at(11)).unwrap();

        let proposal = calendar
            .propose_slot(resource, at(start), at(end), None)
            .unwrap();
        assert_eq!(proposal.is_accepted(), accepted);
    }

    #[test]
    fn test_propose_with_exclude_allows_editing_self() {
        let calendar = BookingCalendar::new();
        let resource = ResourceId::new();
        let slot = calendar.commit_slot(resource, at(9), at(11)).unwrap();

        assert_eq!(
            calendar.propose_slot(resource, at(10), at(12), None).unwrap(),
            Proposal::Conflict { with: slot.id }
        );
        assert!(calendar
            .propose_slot(resource, at(10), at(12), Some(slot.id))
            .unwrap()
            .is_accepted());
    }

    #[test]
    fn test_move_slot_validates_interval() {
        let calendar = BookingCalendar::new();
        let resource = ResourceId::new();
        let slot = calendar.commit_slot(resource, at(9), at(11)).unwrap();

        assert!(matches!(
            calendar.move_slot(slot.id, at(12), at(12)),
            Err(ShopError::InvalidInterval { .. })
        ));
        let moved = calendar.move_slot(slot.id, at(12), at(13)).unwrap();
        assert_eq!(moved.occupancy.start, at(12));
    }

    #[test]
    fn test_vehicle_claim_reports_holder() {
        let occupancy = VehicleOccupancy::new();
        let vehicle = VehicleId::new();
        let first = EvaluationId::new();

        let claim = occupancy.claim(vehicle, first).unwrap();
        assert!(occupancy.is_busy(vehicle));

        let err = occupancy.claim(vehicle, EvaluationId::new()).unwrap_err();
        assert_eq!(
            err,
            ShopError::VehicleBusy {
                vehicle_id: vehicle,
                evaluation_id: first,
            }
        );

        occupancy.release(claim).unwrap();
        assert!(!occupancy.is_busy(vehicle));
        assert!(occupancy.claim(vehicle, EvaluationId::new()).is_ok());
    }
}
