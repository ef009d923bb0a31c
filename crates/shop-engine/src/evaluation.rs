//! 評估單引擎
//!
//! 狀態機：草稿 → 已送出 → 已核准；草稿／已送出 → 已拒絕。終態不可再轉換。
//! 庫存項目透過批次帳扣庫，移除項目時依軌跡回補。

use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use shop_core::{
    ensure_positive_quantity, ensure_price, ClientId, EngineConfig, Evaluation, EvaluationId,
    EvaluationStatus, LineItem, ProductId, Result, ShopError, SlotId, Totals, VehicleId,
};
use std::sync::Arc;

use crate::booking::VehicleOccupancy;
use crate::ledger::StockLedger;

/// 評估單引擎
#[derive(Debug)]
pub struct EvaluationEngine {
    ledger: Arc<StockLedger>,
    vehicles: VehicleOccupancy,
    evaluations: DashMap<EvaluationId, Arc<Mutex<Evaluation>>>,
    /// 評估單對應的車輛佔用
    claims: DashMap<EvaluationId, SlotId>,
    config: Arc<EngineConfig>,
}

impl EvaluationEngine {
    /// 創建評估單引擎
    pub fn new(ledger: Arc<StockLedger>, config: Arc<EngineConfig>) -> Self {
        Self {
            ledger,
            vehicles: VehicleOccupancy::new(),
            evaluations: DashMap::new(),
            claims: DashMap::new(),
            config,
        }
    }

    fn handle(&self, evaluation_id: EvaluationId) -> Result<Arc<Mutex<Evaluation>>> {
        self.evaluations
            .get(&evaluation_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ShopError::not_found("評估單", evaluation_id))
    }

    /// 在評估單鎖內執行操作
    pub(crate) fn with_evaluation<R>(
        &self,
        evaluation_id: EvaluationId,
        f: impl FnOnce(&mut Evaluation) -> Result<R>,
    ) -> Result<R> {
        let handle = self.handle(evaluation_id)?;
        let mut evaluation = handle.lock();
        f(&mut *evaluation)
    }

    /// 編輯項目（僅限草稿／已送出）
    fn edit<R>(
        &self,
        evaluation_id: EvaluationId,
        f: impl FnOnce(&mut Evaluation) -> Result<R>,
    ) -> Result<R> {
        self.with_evaluation(evaluation_id, |evaluation| {
            evaluation.ensure_editable()?;
            let result = f(evaluation)?;
            evaluation.touch();
            Ok(result)
        })
    }

    /// 建立草稿；車輛已有未被拒絕的評估單時失敗
    pub fn create_draft(
        &self,
        client_id: ClientId,
        vehicle_id: VehicleId,
        created_by: Option<&str>,
    ) -> Result<Evaluation> {
        let diagnosis = LineItem::diagnosis(
            self.config.diagnosis_description.clone(),
            self.config.default_diagnosis_price,
        );
        let mut evaluation = Evaluation::new(client_id, vehicle_id, diagnosis);
        if let Some(user_id) = created_by {
            evaluation = evaluation.with_created_by(user_id.to_string());
        }

        let claim = self.vehicles.claim(vehicle_id, evaluation.id)?;
        self.claims.insert(evaluation.id, claim);
        self.evaluations
            .insert(evaluation.id, Arc::new(Mutex::new(evaluation.clone())));

        tracing::info!("車輛 {} 建立評估單 {}", vehicle_id, evaluation.id);
        Ok(evaluation)
    }

    /// 新增手動項目（工資等）
    pub fn add_manual_item(
        &self,
        evaluation_id: EvaluationId,
        description: String,
        price: Decimal,
    ) -> Result<LineItem> {
        ensure_price(price)?;
        self.edit(evaluation_id, |evaluation| {
            let item = LineItem::manual(description, price);
            evaluation.items.push(item.clone());
            Ok(item)
        })
    }

    /// 新增庫存零件項目：先扣庫，扣庫失敗則不新增
    pub fn add_inventory_item(
        &self,
        evaluation_id: EvaluationId,
        product_id: ProductId,
        quantity: Decimal,
    ) -> Result<LineItem> {
        ensure_positive_quantity(quantity)?;
        self.edit(evaluation_id, |evaluation| {
            let product = self.ledger.product(product_id)?;
            let trace = self.ledger.consume(product_id, quantity)?;

            let item = LineItem::inventory(
                format!("{} x{}", product.name, quantity),
                product.sale_price * quantity,
                product_id,
                quantity,
                trace,
            );
            tracing::debug!(
                "評估單 {} 新增零件 {} x{}",
                evaluation.id,
                product.sku,
                quantity
            );
            evaluation.items.push(item.clone());
            Ok(item)
        })
    }

    /// 新增外部服務項目（不經過批次帳）
    pub fn add_external_item(
        &self,
        evaluation_id: EvaluationId,
        service_ref: String,
        price: Decimal,
    ) -> Result<LineItem> {
        ensure_price(price)?;
        self.edit(evaluation_id, |evaluation| {
            let item = LineItem::external(service_ref, price);
            evaluation.items.push(item.clone());
            Ok(item)
        })
    }

    /// 移除項目；庫存項目先回補，回補失敗則不移除
    pub fn remove_item(&self, evaluation_id: EvaluationId, index: usize) -> Result<LineItem> {
        self.edit(evaluation_id, |evaluation| {
            if index == 0 {
                return Err(ShopError::DiagnosisItemProtected);
            }
            if let Some(trace) = evaluation.item(index)?.consumption_trace() {
                self.ledger.restore(trace)?;
            }
            Ok(evaluation.items.remove(index))
        })
    }

    /// 設定項目是否核准（不影響評估單狀態）
    pub fn set_approval(
        &self,
        evaluation_id: EvaluationId,
        index: usize,
        approved: bool,
    ) -> Result<()> {
        self.edit(evaluation_id, |evaluation| {
            evaluation.item_mut(index)?.approved = approved;
            Ok(())
        })
    }

    /// 調整項目價格（診斷項目唯一允許的修改）
    pub fn reprice_item(
        &self,
        evaluation_id: EvaluationId,
        index: usize,
        price: Decimal,
    ) -> Result<()> {
        ensure_price(price)?;
        self.edit(evaluation_id, |evaluation| {
            evaluation.item_mut(index)?.price = price;
            Ok(())
        })
    }

    pub fn set_notes(&self, evaluation_id: EvaluationId, notes: String) -> Result<()> {
        self.edit(evaluation_id, |evaluation| {
            evaluation.notes = notes;
            Ok(())
        })
    }

    /// 計算報價合計與核准合計
    pub fn compute_totals(&self, evaluation_id: EvaluationId) -> Result<Totals> {
        self.with_evaluation(evaluation_id, |evaluation| Ok(evaluation.totals()))
    }

    /// 送出給客戶
    pub fn submit(&self, evaluation_id: EvaluationId) -> Result<Evaluation> {
        self.transition(evaluation_id, EvaluationStatus::Sent)
    }

    /// 核准（之後由工單產生器建立工單）
    pub fn approve(&self, evaluation_id: EvaluationId) -> Result<Evaluation> {
        self.transition(evaluation_id, EvaluationStatus::Approved)
    }

    /// 拒絕並釋放車輛
    ///
    /// 已扣庫存預設不回補（零件視為已使用或已訂購），
    /// 由 `restore_parts_on_reject` 控制。
    pub fn reject(&self, evaluation_id: EvaluationId) -> Result<Evaluation> {
        self.with_evaluation(evaluation_id, |evaluation| {
            evaluation.transition_to(EvaluationStatus::Rejected)?;

            if let Some((_, claim)) = self.claims.remove(&evaluation_id) {
                if let Err(err) = self.vehicles.release(claim) {
                    tracing::warn!("評估單 {} 釋放車輛佔用失敗: {}", evaluation_id, err);
                }
            }

            if self.config.restore_parts_on_reject {
                for trace in evaluation.items.iter().filter_map(LineItem::consumption_trace) {
                    if let Err(err) = self.ledger.restore(trace) {
                        tracing::warn!("評估單 {} 拒絕時回補失敗: {}", evaluation_id, err);
                    }
                }
            }

            tracing::info!("評估單 {} 已拒絕，車輛 {} 釋放", evaluation_id, evaluation.vehicle_id);
            Ok(evaluation.clone())
        })
    }

    fn transition(
        &self,
        evaluation_id: EvaluationId,
        next: EvaluationStatus,
    ) -> Result<Evaluation> {
        self.with_evaluation(evaluation_id, |evaluation| {
            evaluation.transition_to(next)?;
            tracing::info!("評估單 {} 狀態變更為 {}", evaluation_id, next);
            Ok(evaluation.clone())
        })
    }

    /// 評估單快照
    pub fn evaluation(&self, evaluation_id: EvaluationId) -> Result<Evaluation> {
        self.with_evaluation(evaluation_id, |evaluation| Ok(evaluation.clone()))
    }

    /// 車輛的所有評估單（依建立時間）
    pub fn evaluations_for_vehicle(&self, vehicle_id: VehicleId) -> Vec<Evaluation> {
        let handles: Vec<_> = self
            .evaluations
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let mut evaluations: Vec<Evaluation> = handles
            .iter()
            .map(|h| h.lock().clone())
            .filter(|e| e.vehicle_id == vehicle_id)
            .collect();
        evaluations.sort_by_key(|e| e.created_at);
        evaluations
    }

    /// 目前佔用車輛的評估單
    pub fn active_evaluation(&self, vehicle_id: VehicleId) -> Option<EvaluationId> {
        self.vehicles.active_evaluation(vehicle_id)
    }
}
