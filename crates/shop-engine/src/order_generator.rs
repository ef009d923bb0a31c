//! 工單產生
//!
//! 已核准的評估單產生唯一一張工單，只帶入核准項目的快照。
//! 評估單上的工單反向參照在建立前檢查，重試不會產生重複工單。

use shop_core::{
    EngineConfig, Evaluation, EvaluationId, EvaluationStatus, Result, ShopError, WorkOrder,
};
use std::sync::Arc;

use crate::evaluation::EvaluationEngine;
use crate::ledger::StockLedger;
use crate::tracker::WorkOrderTracker;

/// 工單產生器
#[derive(Debug)]
pub struct OrderGenerator {
    ledger: Arc<StockLedger>,
    evaluations: Arc<EvaluationEngine>,
    tracker: Arc<WorkOrderTracker>,
    config: Arc<EngineConfig>,
}

impl OrderGenerator {
    pub fn new(
        ledger: Arc<StockLedger>,
        evaluations: Arc<EvaluationEngine>,
        tracker: Arc<WorkOrderTracker>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            ledger,
            evaluations,
            tracker,
            config,
        }
    }

    /// 由已核准評估單產生工單
    pub fn generate(&self, evaluation_id: EvaluationId) -> Result<WorkOrder> {
        self.evaluations.with_evaluation(evaluation_id, |evaluation| {
            if evaluation.status != EvaluationStatus::Approved {
                return Err(ShopError::NotApproved {
                    evaluation_id,
                    status: evaluation.status,
                });
            }
            if let Some(work_order_id) = evaluation.work_order_id {
                return Err(ShopError::AlreadyGenerated {
                    evaluation_id,
                    work_order_id,
                });
            }

            let order = WorkOrder::from_evaluation(evaluation);
            if self.config.release_unapproved_parts {
                self.release_unapproved_parts(evaluation);
            }

            self.tracker.insert(order.clone());
            evaluation.work_order_id = Some(order.id);
            evaluation.touch();

            tracing::info!(
                "評估單 {} 產生工單 {}：{} 個項目，合計 {}",
                evaluation_id,
                order.id,
                order.items.len(),
                order.total()
            );
            Ok(order)
        })
    }

    /// 回補客戶未核准的零件（批次已刪除時僅記錄警告）
    fn release_unapproved_parts(&self, evaluation: &Evaluation) {
        let traces = evaluation
            .items
            .iter()
            .filter(|item| !item.approved)
            .filter_map(|item| item.consumption_trace());

        for trace in traces {
            match self.ledger.restore(trace) {
                Ok(()) => tracing::debug!(
                    "評估單 {} 未核准零件回補 {}",
                    evaluation.id,
                    trace.total()
                ),
                Err(err) => tracing::warn!(
                    "評估單 {} 未核准零件回補失敗: {}",
                    evaluation.id,
                    err
                ),
            }
        }
    }
}
