//! 維修廠引擎主入口

use chrono::NaiveDate;
use shop_core::{
    Batch, BatchCorrection, BatchId, BatchReceipt, ClientId, EngineConfig, Evaluation,
    EvaluationId, EvaluationStatus, ProductId, Result, SessionContext, ShopError, VehicleId,
    WorkOrder,
};
use std::sync::Arc;

use crate::booking::BookingCalendar;
use crate::evaluation::EvaluationEngine;
use crate::ledger::StockLedger;
use crate::order_generator::OrderGenerator;
use crate::tracker::WorkOrderTracker;
use crate::StockAlert;

/// 維修廠引擎
///
/// 組合批次帳、預約行事曆、評估單引擎、工單產生器與工單追蹤器。
/// 需要操作者身分或權限的操作在此以 [`SessionContext`] 明確傳入。
#[derive(Debug)]
pub struct Workshop {
    config: Arc<EngineConfig>,
    ledger: Arc<StockLedger>,
    calendar: BookingCalendar,
    evaluations: Arc<EvaluationEngine>,
    generator: OrderGenerator,
    tracker: Arc<WorkOrderTracker>,
}

impl Workshop {
    /// 創建新的引擎
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let ledger = Arc::new(StockLedger::new());
        let evaluations = Arc::new(EvaluationEngine::new(
            Arc::clone(&ledger),
            Arc::clone(&config),
        ));
        let tracker = Arc::new(WorkOrderTracker::new());
        let generator = OrderGenerator::new(
            Arc::clone(&ledger),
            Arc::clone(&evaluations),
            Arc::clone(&tracker),
            Arc::clone(&config),
        );

        tracing::info!("維修廠引擎啟動");
        Ok(Self {
            config,
            ledger,
            calendar: BookingCalendar::new(),
            evaluations,
            generator,
            tracker,
        })
    }

    /// 進貨（記錄收貨人）
    pub fn receive_batch(
        &self,
        ctx: &SessionContext,
        product_id: ProductId,
        receipt: BatchReceipt,
    ) -> Result<Batch> {
        self.ledger
            .receive_batch(product_id, receipt.with_received_by(ctx.user_id.clone()))
    }

    /// 人工修正批次（限管理者）
    pub fn correct_batch(
        &self,
        ctx: &SessionContext,
        batch_id: BatchId,
        correction: BatchCorrection,
    ) -> Result<Batch> {
        ctx.require_admin("修正批次")?;
        tracing::info!("{} 修正批次 {}", ctx.user_id, batch_id);
        self.ledger.correct_batch(batch_id, correction)
    }

    /// 刪除批次（限管理者）
    pub fn delete_batch(&self, ctx: &SessionContext, batch_id: BatchId) -> Result<Batch> {
        ctx.require_admin("刪除批次")?;
        tracing::info!("{} 刪除批次 {}", ctx.user_id, batch_id);
        self.ledger.delete_batch(batch_id)
    }

    /// 建立評估單草稿
    pub fn create_draft(
        &self,
        ctx: &SessionContext,
        client_id: ClientId,
        vehicle_id: VehicleId,
    ) -> Result<Evaluation> {
        self.evaluations
            .create_draft(client_id, vehicle_id, Some(&ctx.user_id))
    }

    /// 核准評估單並產生工單
    ///
    /// 已核准的評估單重試時直接進入工單產生，已有工單則回報 `AlreadyGenerated`。
    pub fn approve(&self, ctx: &SessionContext, evaluation_id: EvaluationId) -> Result<WorkOrder> {
        match self.evaluations.approve(evaluation_id) {
            Ok(_) => tracing::info!("{} 核准評估單 {}", ctx.user_id, evaluation_id),
            Err(ShopError::InvalidTransition {
                from: EvaluationStatus::Approved,
                ..
            }) => {}
            Err(err) => return Err(err),
        }
        self.generator.generate(evaluation_id)
    }

    /// 庫存提醒（到期天數取自配置）
    pub fn stock_alerts(&self, today: NaiveDate) -> Vec<StockAlert> {
        self.ledger
            .stock_alerts(today, self.config.expiry_warning_days)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 獲取批次帳引用
    pub fn ledger(&self) -> &StockLedger {
        &self.ledger
    }

    /// 獲取預約行事曆引用
    pub fn calendar(&self) -> &BookingCalendar {
        &self.calendar
    }

    /// 獲取評估單引擎引用
    pub fn evaluations(&self) -> &EvaluationEngine {
        &self.evaluations
    }

    /// 獲取工單產生器引用
    pub fn generator(&self) -> &OrderGenerator {
        &self.generator
    }

    /// 獲取工單追蹤器引用
    pub fn tracker(&self) -> &WorkOrderTracker {
        &self.tracker
    }
}
