//! 工單模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::evaluation::{Evaluation, LineItem};
use crate::ids::{ClientId, EvaluationId, MechanicId, VehicleId, WorkOrderId};

/// 工單狀態
///
/// 任意狀態之間皆可切換，不強制先後順序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    /// 待處理
    Pending,
    /// 施工中
    InProgress,
    /// 等待零件
    WaitingParts,
    /// 完工
    Finished,
    /// 已交車
    Delivered,
}

impl WorkOrderStatus {
    pub const ALL: [WorkOrderStatus; 5] = [
        WorkOrderStatus::Pending,
        WorkOrderStatus::InProgress,
        WorkOrderStatus::WaitingParts,
        WorkOrderStatus::Finished,
        WorkOrderStatus::Delivered,
    ];
}

impl fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkOrderStatus::Pending => "待處理",
            WorkOrderStatus::InProgress => "施工中",
            WorkOrderStatus::WaitingParts => "等待零件",
            WorkOrderStatus::Finished => "完工",
            WorkOrderStatus::Delivered => "已交車",
        };
        f.write_str(label)
    }
}

/// 工單（由已核准的評估單產生）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    /// 工單ID
    pub id: WorkOrderId,

    /// 來源評估單
    pub evaluation_id: EvaluationId,

    pub client_id: ClientId,
    pub vehicle_id: VehicleId,

    /// 核准當下的項目快照
    pub items: Vec<LineItem>,

    pub status: WorkOrderStatus,

    /// 負責技師
    pub mechanic_id: Option<MechanicId>,

    /// 內部備註
    pub notes: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkOrder {
    /// 以評估單的已核准項目建立工單快照
    pub fn from_evaluation(evaluation: &Evaluation) -> Self {
        let now = Utc::now();
        Self {
            id: WorkOrderId::new(),
            evaluation_id: evaluation.id,
            client_id: evaluation.client_id,
            vehicle_id: evaluation.vehicle_id,
            items: evaluation.approved_items(),
            status: WorkOrderStatus::Pending,
            mechanic_id: None,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 工單總額
    pub fn total(&self) -> Decimal {
        self.items.iter().map(|i| i.price).sum()
    }

    /// 是否已指派技師
    pub fn is_assigned(&self) -> bool {
        self.mechanic_id.is_some()
    }

    pub fn set_status(&mut self, status: WorkOrderStatus) {
        self.status = status;
        self.touch();
    }

    pub fn assign(&mut self, mechanic_id: Option<MechanicId>) {
        self.mechanic_id = mechanic_id;
        self.touch();
    }

    pub fn set_notes(&mut self, notes: String) {
        self.notes = notes;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// 工單查詢條件
#[derive(Debug, Clone, Default)]
pub struct WorkOrderFilter {
    pub status: Option<WorkOrderStatus>,
    pub mechanic_id: Option<MechanicId>,
}

impl WorkOrderFilter {
    /// 建構器模式：設置狀態
    pub fn with_status(mut self, status: WorkOrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// 建構器模式：設置技師
    pub fn with_mechanic(mut self, mechanic_id: MechanicId) -> Self {
        self.mechanic_id = Some(mechanic_id);
        self
    }

    pub fn matches(&self, order: &WorkOrder) -> bool {
        self.status.map_or(true, |s| order.status == s)
            && self
                .mechanic_id
                .map_or(true, |m| order.mechanic_id == Some(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approved_evaluation() -> Evaluation {
        let mut evaluation = Evaluation::new(
            ClientId::new(),
            VehicleId::new(),
            LineItem::diagnosis("診斷".to_string(), Decimal::from(100)),
        );
        evaluation.items[0].approved = true;
        let mut labor = LineItem::manual("工資".to_string(), Decimal::from(200));
        labor.approved = true;
        evaluation.items.push(labor);
        evaluation
            .items
            .push(LineItem::manual("洗車".to_string(), Decimal::from(50)));
        evaluation
    }

    #[test]
    fn test_create_from_evaluation_copies_only_approved() {
        let evaluation = approved_evaluation();
        let order = WorkOrder::from_evaluation(&evaluation);

        assert_eq!(order.evaluation_id, evaluation.id);
        assert_eq!(order.vehicle_id, evaluation.vehicle_id);
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.total(), Decimal::from(300));
        assert_eq!(order.status, WorkOrderStatus::Pending);
        assert!(!order.is_assigned());
    }

    #[test]
    fn test_snapshot_is_independent_of_evaluation() {
        let mut evaluation = approved_evaluation();
        let order = WorkOrder::from_evaluation(&evaluation);

        evaluation.items[1].price = Decimal::from(999);
        assert_eq!(order.total(), Decimal::from(300));
    }

    #[test]
    fn test_filter() {
        let mechanic = MechanicId::new();
        let mut order = WorkOrder::from_evaluation(&approved_evaluation());
        order.assign(Some(mechanic));
        order.set_status(WorkOrderStatus::InProgress);

        assert!(WorkOrderFilter::default().matches(&order));
        assert!(WorkOrderFilter::default()
            .with_status(WorkOrderStatus::InProgress)
            .with_mechanic(mechanic)
            .matches(&order));
        assert!(!WorkOrderFilter::default()
            .with_status(WorkOrderStatus::Delivered)
            .matches(&order));
    }
}
