//! 庫存批次帳
//!
//! 庫存以批次為單位記錄，扣庫依進貨日期先進先出（同日依建立順序）。
//! 每個商品一把鎖，不同商品的操作互不阻塞。

use chrono::NaiveDate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use shop_core::{
    ensure_positive_quantity, ensure_price, Batch, BatchCorrection, BatchId, BatchReceipt,
    ConsumptionTrace, Product, ProductId, ProductUpdate, Result, ShopError,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{AlertSeverity, StockAlert};

/// 單一商品的庫存狀態（受商品鎖保護）
#[derive(Debug)]
struct ProductStock {
    product: Product,
    batches: Vec<Batch>,
}

impl ProductStock {
    fn available(&self) -> Decimal {
        self.batches.iter().map(|b| b.current_quantity).sum()
    }

    fn batch_mut(&mut self, batch_id: BatchId) -> Option<&mut Batch> {
        self.batches.iter_mut().find(|b| b.id == batch_id)
    }

    /// 依先進先出排序的批次索引
    fn fifo_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.batches.len()).collect();
        order.sort_by_key(|&i| self.batches[i].fifo_key());
        order
    }

    fn sorted_batches(&self) -> Vec<Batch> {
        self.fifo_order()
            .into_iter()
            .map(|i| self.batches[i].clone())
            .collect()
    }
}

/// 庫存批次帳
#[derive(Debug, Default)]
pub struct StockLedger {
    products: DashMap<ProductId, Arc<Mutex<ProductStock>>>,
    batch_index: DashMap<BatchId, ProductId>,
    skus: DashMap<String, ProductId>,
    sequence: AtomicU64,
}

impl StockLedger {
    /// 創建空的批次帳
    pub fn new() -> Self {
        Self::default()
    }

    fn stock(&self, product_id: ProductId) -> Result<Arc<Mutex<ProductStock>>> {
        self.products
            .get(&product_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ShopError::not_found("商品", product_id))
    }

    fn owner_of(&self, batch_id: BatchId) -> Result<ProductId> {
        self.batch_index
            .get(&batch_id)
            .map(|entry| *entry.value())
            .ok_or(ShopError::BatchNotFound(batch_id))
    }

    fn all_stocks(&self) -> Vec<Arc<Mutex<ProductStock>>> {
        self.products
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// 登錄商品（SKU 必須唯一）
    pub fn register_product(&self, product: Product) -> Result<Product> {
        ensure_price(product.sale_price)?;

        let Entry::Vacant(product_slot) = self.products.entry(product.id) else {
            return Err(ShopError::DuplicateProduct(product.id));
        };
        match self.skus.entry(product.sku.clone()) {
            Entry::Occupied(_) => return Err(ShopError::DuplicateSku(product.sku)),
            Entry::Vacant(slot) => {
                slot.insert(product.id);
            }
        }

        product_slot.insert(Arc::new(Mutex::new(ProductStock {
            product: product.clone(),
            batches: Vec::new(),
        })));

        tracing::info!("登錄商品 {} ({})", product.name, product.sku);
        Ok(product)
    }

    /// 更新商品資料
    pub fn update_product(&self, product_id: ProductId, update: ProductUpdate) -> Result<Product> {
        if let Some(price) = update.sale_price {
            ensure_price(price)?;
        }

        let stock = self.stock(product_id)?;
        let mut stock = stock.lock();

        if let Some(new_sku) = update.sku.as_ref().filter(|s| **s != stock.product.sku) {
            match self.skus.entry(new_sku.clone()) {
                Entry::Occupied(_) => return Err(ShopError::DuplicateSku(new_sku.clone())),
                Entry::Vacant(slot) => {
                    slot.insert(product_id);
                }
            }
            self.skus.remove(&stock.product.sku);
        }

        stock.product.apply(update);
        Ok(stock.product.clone())
    }

    pub fn product(&self, product_id: ProductId) -> Result<Product> {
        Ok(self.stock(product_id)?.lock().product.clone())
    }

    /// 所有商品（依名稱排序）
    pub fn products(&self) -> Vec<Product> {
        let mut products: Vec<Product> = self
            .all_stocks()
            .iter()
            .map(|s| s.lock().product.clone())
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        products
    }

    pub fn find_by_sku(&self, sku: &str) -> Option<Product> {
        let product_id = *self.skus.get(sku)?.value();
        self.product(product_id).ok()
    }

    /// 可用數量（所有批次剩餘數量加總）
    pub fn available_quantity(&self, product_id: ProductId) -> Result<Decimal> {
        Ok(self.stock(product_id)?.lock().available())
    }

    /// 進貨：建立新批次
    pub fn receive_batch(&self, product_id: ProductId, receipt: BatchReceipt) -> Result<Batch> {
        receipt.validate()?;

        let stock = self.stock(product_id)?;
        let mut stock = stock.lock();

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let batch = Batch::from_receipt(product_id, receipt, sequence);
        self.batch_index.insert(batch.id, product_id);
        stock.batches.push(batch.clone());

        tracing::info!(
            "商品 {} 進貨批次 {}：數量 {}, 單位成本 {}",
            stock.product.sku,
            batch.id,
            batch.initial_quantity,
            batch.unit_cost
        );
        Ok(batch)
    }

    /// 先進先出扣庫
    ///
    /// 可用數量不足時整筆失敗，不會修改任何批次。
    pub fn consume(&self, product_id: ProductId, quantity: Decimal) -> Result<ConsumptionTrace> {
        ensure_positive_quantity(quantity)?;

        let stock = self.stock(product_id)?;
        let mut stock = stock.lock();

        let available = stock.available();
        if available < quantity {
            tracing::debug!(
                "商品 {} 庫存不足：需要 {}, 可用 {}",
                stock.product.sku,
                quantity,
                available
            );
            return Err(ShopError::InsufficientStock {
                product_id,
                requested: quantity,
                available,
            });
        }

        let mut trace = ConsumptionTrace::new(product_id);
        let mut remaining = quantity;

        for index in stock.fifo_order() {
            if remaining <= Decimal::ZERO {
                break;
            }
            let batch = &mut stock.batches[index];
            let taken = batch.take(remaining);
            if taken > Decimal::ZERO {
                tracing::debug!("批次 {} 扣除 {}", batch.id, taken);
                trace.record(batch.id, taken);
                remaining -= taken;
            }
        }

        tracing::info!("商品 {} 扣庫 {}", stock.product.sku, quantity);
        Ok(trace)
    }

    /// 依扣庫軌跡精確回補
    ///
    /// 軌跡中任何批次已被刪除時整筆失敗並回報該批次。
    pub fn restore(&self, trace: &ConsumptionTrace) -> Result<()> {
        let stock = self.stock(trace.product_id)?;
        let mut stock = stock.lock();

        if let Some(missing) = trace
            .entries
            .iter()
            .find(|entry| !stock.batches.iter().any(|b| b.id == entry.batch_id))
        {
            tracing::warn!("回補失敗：批次 {} 已不存在", missing.batch_id);
            return Err(ShopError::BatchNotFound(missing.batch_id));
        }

        for entry in &trace.entries {
            if let Some(batch) = stock.batch_mut(entry.batch_id) {
                batch.current_quantity += entry.quantity;
            }
        }

        tracing::info!("商品 {} 回補 {}", stock.product.sku, trace.total());
        Ok(())
    }

    /// 人工修正批次
    pub fn correct_batch(&self, batch_id: BatchId, correction: BatchCorrection) -> Result<Batch> {
        correction.validate(batch_id)?;

        let stock = self.stock(self.owner_of(batch_id)?)?;
        let mut stock = stock.lock();
        let batch = stock
            .batch_mut(batch_id)
            .ok_or(ShopError::BatchNotFound(batch_id))?;

        if correction.is_overflow() {
            tracing::warn!(
                "批次 {} 人工修正：剩餘 {} 超過進貨 {}（已確認）",
                batch_id,
                correction.current_quantity,
                correction.initial_quantity
            );
        }

        batch.apply_correction(&correction);
        Ok(batch.clone())
    }

    /// 刪除批次，庫存立即扣除該批次剩餘數量
    pub fn delete_batch(&self, batch_id: BatchId) -> Result<Batch> {
        let stock = self.stock(self.owner_of(batch_id)?)?;
        let mut stock = stock.lock();

        let position = stock
            .batches
            .iter()
            .position(|b| b.id == batch_id)
            .ok_or(ShopError::BatchNotFound(batch_id))?;
        let batch = stock.batches.remove(position);
        self.batch_index.remove(&batch_id);

        tracing::info!(
            "刪除批次 {}（商品 {}），剩餘 {} 一併移除",
            batch_id,
            stock.product.sku,
            batch.current_quantity
        );
        Ok(batch)
    }

    pub fn batch(&self, batch_id: BatchId) -> Result<Batch> {
        let stock = self.stock(self.owner_of(batch_id)?)?;
        let stock = stock.lock();
        stock
            .batches
            .iter()
            .find(|b| b.id == batch_id)
            .cloned()
            .ok_or(ShopError::BatchNotFound(batch_id))
    }

    /// 商品批次（先進先出順序）
    pub fn batches(&self, product_id: ProductId) -> Result<Vec<Batch>> {
        Ok(self.stock(product_id)?.lock().sorted_batches())
    }

    /// 庫存價值（剩餘數量 × 單位成本）
    pub fn stock_value(&self, product_id: ProductId) -> Result<Decimal> {
        let stock = self.stock(product_id)?;
        let stock = stock.lock();
        Ok(stock.batches.iter().map(Batch::stock_value).sum())
    }

    /// 指定天數內到期且仍有剩餘的批次
    pub fn expiring_batches(&self, today: NaiveDate, within_days: u32) -> Vec<Batch> {
        let mut batches: Vec<Batch> = self
            .all_stocks()
            .iter()
            .flat_map(|s| {
                s.lock()
                    .batches
                    .iter()
                    .filter(|b| !b.is_depleted() && b.expires_within(today, within_days))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        batches.sort_by_key(|b| b.expiration_date);
        batches
    }

    /// 庫存提醒：低於最低庫存、已過期、即將到期
    pub fn stock_alerts(&self, today: NaiveDate, expiry_warning_days: u32) -> Vec<StockAlert> {
        let mut alerts = Vec::new();

        for stock in self.all_stocks() {
            let stock = stock.lock();
            let product = &stock.product;
            let available = stock.available();

            if product.is_below_minimum(available) {
                alerts.push(StockAlert::warning(
                    product.id,
                    format!(
                        "{} 可用 {} 低於最低庫存 {}，建議補貨 {}",
                        product.sku,
                        available,
                        product.minimum_stock,
                        product.replenishment_needed(available)
                    ),
                ));
            }

            for batch in stock.batches.iter().filter(|b| !b.is_depleted()) {
                if batch.is_expired(today) {
                    alerts.push(StockAlert::error(
                        product.id,
                        format!(
                            "{} 批次 {} 已過期，仍有 {}",
                            product.sku, batch.id, batch.current_quantity
                        ),
                    ));
                } else if batch.expires_within(today, expiry_warning_days) {
                    alerts.push(StockAlert::info(
                        product.id,
                        format!("{} 批次 {} 即將到期", product.sku, batch.id),
                    ));
                }
            }
        }

        alerts.sort_by(|a, b| b.severity.cmp(&a.severity));
        alerts
    }
}

/// 依嚴重度統計提醒數量
pub fn count_by_severity(alerts: &[StockAlert], severity: AlertSeverity) -> usize {
    alerts.iter().filter(|a| a.severity == severity).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ledger_with_product(sku: &str) -> (StockLedger, ProductId) {
        let ledger = StockLedger::new();
        let product = ledger
            .register_product(Product::new(
                format!("商品 {sku}"),
                sku.to_string(),
                Decimal::from(150),
            ))
            .unwrap();
        (ledger, product.id)
    }

    fn receive(
        ledger: &StockLedger,
        product_id: ProductId,
        qty: i64,
        cost: i64,
        day: u32,
    ) -> Batch {
        ledger
            .receive_batch(
                product_id,
                BatchReceipt::new(Decimal::from(qty), Decimal::from(cost), date(2025, 10, day)),
            )
            .unwrap()
    }

    #[test]
    fn test_duplicate_sku_rejected() {
        let (ledger, _) = ledger_with_product("OIL-001");
        let err = ledger
            .register_product(Product::new("另一個".to_string(), "OIL-001".to_string(), Decimal::ONE))
            .unwrap_err();
        assert_eq!(err, ShopError::DuplicateSku("OIL-001".to_string()));
    }

    #[test]
    fn test_reregistering_product_keeps_existing_batches() {
        let (ledger, product_id) = ledger_with_product("OIL-001");
        let batch = receive(&ledger, product_id, 5, 100, 1);

        let mut again = ledger.product(product_id).unwrap();
        again.sku = "OIL-002".to_string();
        assert_eq!(
            ledger.register_product(again).unwrap_err(),
            ShopError::DuplicateProduct(product_id)
        );

        assert_eq!(ledger.batch(batch.id).unwrap().current_quantity, Decimal::from(5));
        assert!(ledger.find_by_sku("OIL-002").is_none());
        assert_eq!(ledger.find_by_sku("OIL-001").unwrap().id, product_id);
    }

    #[test]
    fn test_available_is_sum_of_batches() {
        let (ledger, product_id) = ledger_with_product("OIL-001");
        assert_eq!(ledger.available_quantity(product_id).unwrap(), Decimal::ZERO);

        receive(&ledger, product_id, 5, 100, 1);
        receive(&ledger, product_id, 3, 120, 2);
        assert_eq!(ledger.available_quantity(product_id).unwrap(), Decimal::from(8));
        assert_eq!(ledger.stock_value(product_id).unwrap(), Decimal::from(860));
    }

    #[test]
    fn test_receive_rejects_zero_quantity() {
        let (ledger, product_id) = ledger_with_product("OIL-001");
        let err = ledger
            .receive_batch(
                product_id,
                BatchReceipt::new(Decimal::ZERO, Decimal::ONE, date(2025, 10, 1)),
            )
            .unwrap_err();
        assert_eq!(err, ShopError::InvalidQuantity(Decimal::ZERO));
    }

    #[test]
    fn test_consume_fifo_across_batches() {
        let (ledger, product_id) = ledger_with_product("OIL-001");
        // 後進的批次先登錄，確認依日期而非登錄順序
        let b2 = receive(&ledger, product_id, 3, 120, 2);
        let b1 = receive(&ledger, product_id, 5, 100, 1);

        let trace = ledger.consume(product_id, Decimal::from(6)).unwrap();

        assert_eq!(trace.entries.len(), 2);
        assert_eq!(trace.entries[0].batch_id, b1.id);
        assert_eq!(trace.entries[0].quantity, Decimal::from(5));
        assert_eq!(trace.entries[1].batch_id, b2.id);
        assert_eq!(trace.entries[1].quantity, Decimal::ONE);

        assert_eq!(ledger.batch(b1.id).unwrap().current_quantity, Decimal::ZERO);
        assert_eq!(ledger.batch(b2.id).unwrap().current_quantity, Decimal::from(2));
    }

    #[test]
    fn test_consume_same_day_uses_creation_order() {
        let (ledger, product_id) = ledger_with_product("OIL-001");
        let first = receive(&ledger, product_id, 2, 100, 1);
        let second = receive(&ledger, product_id, 2, 100, 1);

        let trace = ledger.consume(product_id, Decimal::from(3)).unwrap();
        assert_eq!(trace.entries[0].batch_id, first.id);
        assert_eq!(trace.entries[1].batch_id, second.id);
    }

    #[test]
    fn test_consume_insufficient_changes_nothing() {
        let (ledger, product_id) = ledger_with_product("OIL-001");
        receive(&ledger, product_id, 5, 100, 1);
        receive(&ledger, product_id, 3, 120, 2);
        let before = ledger.batches(product_id).unwrap();

        let err = ledger.consume(product_id, Decimal::from(9)).unwrap_err();
        assert_eq!(
            err,
            ShopError::InsufficientStock {
                product_id,
                requested: Decimal::from(9),
                available: Decimal::from(8),
            }
        );
        assert_eq!(ledger.batches(product_id).unwrap(), before);
    }

    #[test]
    fn test_consume_then_restore_round_trip() {
        let (ledger, product_id) = ledger_with_product("OIL-001");
        receive(&ledger, product_id, 5, 100, 1);
        receive(&ledger, product_id, 3, 120, 2);
        let before = ledger.batches(product_id).unwrap();

        let trace = ledger.consume(product_id, Decimal::from(7)).unwrap();
        ledger.restore(&trace).unwrap();

        assert_eq!(ledger.batches(product_id).unwrap(), before);
    }

    #[test]
    fn test_restore_reports_deleted_batch() {
        let (ledger, product_id) = ledger_with_product("OIL-001");
        let b1 = receive(&ledger, product_id, 5, 100, 1);
        let b2 = receive(&ledger, product_id, 3, 120, 2);

        let trace = ledger.consume(product_id, Decimal::from(6)).unwrap();
        ledger.delete_batch(b1.id).unwrap();

        assert_eq!(ledger.restore(&trace), Err(ShopError::BatchNotFound(b1.id)));
        // 失敗時其他批次也不回補
        assert_eq!(ledger.batch(b2.id).unwrap().current_quantity, Decimal::from(2));
    }

    #[test]
    fn test_delete_batch_drops_stock() {
        let (ledger, product_id) = ledger_with_product("OIL-001");
        let b1 = receive(&ledger, product_id, 5, 100, 1);
        receive(&ledger, product_id, 3, 120, 2);

        let deleted = ledger.delete_batch(b1.id).unwrap();
        assert_eq!(deleted.current_quantity, Decimal::from(5));
        assert_eq!(ledger.available_quantity(product_id).unwrap(), Decimal::from(3));
        assert_eq!(ledger.delete_batch(b1.id), Err(ShopError::BatchNotFound(b1.id)));
    }

    #[test]
    fn test_correct_batch_overflow_needs_confirmation() {
        let (ledger, product_id) = ledger_with_product("OIL-001");
        let batch = receive(&ledger, product_id, 5, 100, 1);

        let correction = BatchCorrection::from_batch(&batch)
            .with_quantities(Decimal::from(5), Decimal::from(7));
        assert!(matches!(
            ledger.correct_batch(batch.id, correction.clone()),
            Err(ShopError::InconsistentCorrection { .. })
        ));
        assert_eq!(ledger.available_quantity(product_id).unwrap(), Decimal::from(5));

        let corrected = ledger.correct_batch(batch.id, correction.confirmed()).unwrap();
        assert!(corrected.manually_corrected);
        assert_eq!(ledger.available_quantity(product_id).unwrap(), Decimal::from(7));
    }

    #[test]
    fn test_update_product_sku_uniqueness() {
        let (ledger, product_id) = ledger_with_product("OIL-001");
        ledger
            .register_product(Product::new("濾芯".to_string(), "FLT-001".to_string(), Decimal::ONE))
            .unwrap();

        let err = ledger
            .update_product(
                product_id,
                ProductUpdate {
                    sku: Some("FLT-001".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err, ShopError::DuplicateSku("FLT-001".to_string()));

        ledger
            .update_product(
                product_id,
                ProductUpdate {
                    sku: Some("OIL-002".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(ledger.find_by_sku("OIL-001").is_none());
        assert_eq!(ledger.find_by_sku("OIL-002").unwrap().id, product_id);
    }

    #[test]
    fn test_unknown_product_is_not_found() {
        let ledger = StockLedger::new();
        let err = ledger.available_quantity(ProductId::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_stock_alerts() {
        let ledger = StockLedger::new();
        let product = ledger
            .register_product(
                Product::new("冷卻液".to_string(), "CLT-001".to_string(), Decimal::from(90))
                    .with_minimum_stock(Decimal::from(10)),
            )
            .unwrap();
        ledger
            .receive_batch(
                product.id,
                BatchReceipt::new(Decimal::from(2), Decimal::ONE, date(2025, 1, 1))
                    .with_expiration_date(date(2025, 10, 1)),
            )
            .unwrap();
        ledger
            .receive_batch(
                product.id,
                BatchReceipt::new(Decimal::from(3), Decimal::ONE, date(2025, 2, 1))
                    .with_expiration_date(date(2025, 10, 20)),
            )
            .unwrap();

        let alerts = ledger.stock_alerts(date(2025, 10, 10), 30);
        assert_eq!(count_by_severity(&alerts, AlertSeverity::Error), 1);
        assert_eq!(count_by_severity(&alerts, AlertSeverity::Warning), 1);
        assert_eq!(count_by_severity(&alerts, AlertSeverity::Info), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Error);

        let expiring = ledger.expiring_batches(date(2025, 10, 10), 15);
        assert_eq!(expiring.len(), 2);
    }

    #[test]
    fn test_alerts_with_unbounded_warning_window() {
        let (ledger, product_id) = ledger_with_product("CLT-002");
        ledger
            .receive_batch(
                product_id,
                BatchReceipt::new(Decimal::from(2), Decimal::ONE, date(2025, 1, 1))
                    .with_expiration_date(date(2027, 1, 1)),
            )
            .unwrap();

        let alerts = ledger.stock_alerts(date(2025, 1, 2), u32::MAX);
        assert_eq!(count_by_severity(&alerts, AlertSeverity::Info), 1);
        assert_eq!(ledger.expiring_batches(date(2025, 1, 2), u32::MAX).len(), 1);
    }
}
