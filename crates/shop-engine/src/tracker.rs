//! 工單追蹤

use dashmap::DashMap;
use shop_core::{
    EvaluationId, MechanicId, Result, ShopError, WorkOrder, WorkOrderFilter, WorkOrderId,
    WorkOrderStatus,
};

/// 工單追蹤器
///
/// 狀態、技師、備註皆為獨立的部分更新。
#[derive(Debug, Default)]
pub struct WorkOrderTracker {
    orders: DashMap<WorkOrderId, WorkOrder>,
    by_evaluation: DashMap<EvaluationId, WorkOrderId>,
}

impl WorkOrderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, order: WorkOrder) {
        self.by_evaluation.insert(order.evaluation_id, order.id);
        self.orders.insert(order.id, order);
    }

    fn update(
        &self,
        order_id: WorkOrderId,
        f: impl FnOnce(&mut WorkOrder),
    ) -> Result<WorkOrder> {
        let mut order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| ShopError::not_found("工單", order_id))?;
        f(order.value_mut());
        Ok(order.clone())
    }

    /// 更新狀態（五種狀態間可任意切換）
    pub fn update_status(
        &self,
        order_id: WorkOrderId,
        status: WorkOrderStatus,
    ) -> Result<WorkOrder> {
        let order = self.update(order_id, |order| order.set_status(status))?;
        tracing::info!("工單 {} 狀態變更為 {}", order_id, status);
        Ok(order)
    }

    /// 指派或取消指派技師
    pub fn assign_mechanic(
        &self,
        order_id: WorkOrderId,
        mechanic_id: Option<MechanicId>,
    ) -> Result<WorkOrder> {
        let order = self.update(order_id, |order| order.assign(mechanic_id))?;
        match mechanic_id {
            Some(mechanic) => tracing::info!("工單 {} 指派技師 {}", order_id, mechanic),
            None => tracing::info!("工單 {} 取消指派技師", order_id),
        }
        Ok(order)
    }

    pub fn set_notes(&self, order_id: WorkOrderId, notes: String) -> Result<WorkOrder> {
        self.update(order_id, |order| order.set_notes(notes))
    }

    pub fn work_order(&self, order_id: WorkOrderId) -> Result<WorkOrder> {
        self.orders
            .get(&order_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ShopError::not_found("工單", order_id))
    }

    /// 由評估單反查工單
    pub fn find_by_evaluation(&self, evaluation_id: EvaluationId) -> Option<WorkOrder> {
        let order_id = *self.by_evaluation.get(&evaluation_id)?.value();
        self.work_order(order_id).ok()
    }

    /// 依條件列出工單（依建立時間）
    pub fn list(&self, filter: &WorkOrderFilter) -> Vec<WorkOrder> {
        let mut orders: Vec<WorkOrder> = self
            .orders
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by_key(|o| o.created_at);
        orders
    }
}
