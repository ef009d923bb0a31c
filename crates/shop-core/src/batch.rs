//! 庫存批次模型

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::{BatchId, ProductId};
use crate::{ensure_positive_quantity, ensure_price, Result, ShopError};

/// 批次（同一次進貨、同一成本的一批數量）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// 批次ID
    pub id: BatchId,

    /// 所屬商品
    pub product_id: ProductId,

    /// 進貨數量
    pub initial_quantity: Decimal,

    /// 剩餘數量
    pub current_quantity: Decimal,

    /// 單位成本
    pub unit_cost: Decimal,

    /// 進貨日期（先進先出依據）
    pub entry_date: NaiveDate,

    /// 有效期限
    pub expiration_date: Option<NaiveDate>,

    /// 建立順序（同日進貨時的先後）
    pub sequence: u64,

    /// 是否經過人工修正
    pub manually_corrected: bool,

    /// 收貨人
    pub received_by: Option<String>,
}

impl Batch {
    /// 以進貨單創建批次
    pub fn from_receipt(product_id: ProductId, receipt: BatchReceipt, sequence: u64) -> Self {
        Self {
            id: BatchId::new(),
            product_id,
            initial_quantity: receipt.quantity,
            current_quantity: receipt.quantity,
            unit_cost: receipt.unit_cost,
            entry_date: receipt.entry_date,
            expiration_date: receipt.expiration_date,
            sequence,
            manually_corrected: false,
            received_by: receipt.received_by,
        }
    }

    /// 先進先出排序鍵
    pub fn fifo_key(&self) -> (NaiveDate, u64) {
        (self.entry_date, self.sequence)
    }

    /// 是否已用完
    pub fn is_depleted(&self) -> bool {
        self.current_quantity <= Decimal::ZERO
    }

    /// 是否已過期
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiration_date.is_some_and(|date| date < today)
    }

    /// 是否在指定天數內到期（含已過期）
    ///
    /// 期限超出日期範圍時視為無上限。
    pub fn expires_within(&self, today: NaiveDate, days: u32) -> bool {
        let horizon = today.checked_add_days(Days::new(u64::from(days)));
        self.expiration_date
            .is_some_and(|date| horizon.map_or(true, |horizon| date <= horizon))
    }

    /// 剩餘庫存價值
    pub fn stock_value(&self) -> Decimal {
        self.current_quantity * self.unit_cost
    }

    /// 從批次扣除，最多扣到零，回傳實際扣除數量
    pub fn take(&mut self, quantity: Decimal) -> Decimal {
        let taken = quantity.min(self.current_quantity);
        self.current_quantity -= taken;
        taken
    }

    /// 套用人工修正
    pub fn apply_correction(&mut self, correction: &BatchCorrection) {
        self.initial_quantity = correction.initial_quantity;
        self.current_quantity = correction.current_quantity;
        self.unit_cost = correction.unit_cost;
        self.entry_date = correction.entry_date;
        self.expiration_date = correction.expiration_date;
        self.manually_corrected = true;
    }
}

/// 進貨單
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReceipt {
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub entry_date: NaiveDate,
    pub expiration_date: Option<NaiveDate>,
    pub received_by: Option<String>,
}

impl BatchReceipt {
    /// 創建新的進貨單
    pub fn new(quantity: Decimal, unit_cost: Decimal, entry_date: NaiveDate) -> Self {
        Self {
            quantity,
            unit_cost,
            entry_date,
            expiration_date: None,
            received_by: None,
        }
    }

    /// 建構器模式：設置有效期限
    pub fn with_expiration_date(mut self, expiration_date: NaiveDate) -> Self {
        self.expiration_date = Some(expiration_date);
        self
    }

    /// 建構器模式：設置收貨人
    pub fn with_received_by(mut self, user_id: String) -> Self {
        self.received_by = Some(user_id);
        self
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive_quantity(self.quantity)?;
        ensure_price(self.unit_cost)
    }
}

/// 批次人工修正
///
/// `current_quantity > initial_quantity` 只有在 `confirm_overflow` 為真時才會被接受。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCorrection {
    pub initial_quantity: Decimal,
    pub current_quantity: Decimal,
    pub unit_cost: Decimal,
    pub entry_date: NaiveDate,
    pub expiration_date: Option<NaiveDate>,
    pub confirm_overflow: bool,
}

impl BatchCorrection {
    /// 以現有批次為基礎建立修正
    pub fn from_batch(batch: &Batch) -> Self {
        Self {
            initial_quantity: batch.initial_quantity,
            current_quantity: batch.current_quantity,
            unit_cost: batch.unit_cost,
            entry_date: batch.entry_date,
            expiration_date: batch.expiration_date,
            confirm_overflow: false,
        }
    }

    /// 建構器模式：設置數量
    pub fn with_quantities(mut self, initial: Decimal, current: Decimal) -> Self {
        self.initial_quantity = initial;
        self.current_quantity = current;
        self
    }

    /// 建構器模式：設置單位成本
    pub fn with_unit_cost(mut self, unit_cost: Decimal) -> Self {
        self.unit_cost = unit_cost;
        self
    }

    /// 建構器模式：確認剩餘數量可超過進貨數量
    pub fn confirmed(mut self) -> Self {
        self.confirm_overflow = true;
        self
    }

    /// 是否為超量修正（剩餘 > 進貨）
    pub fn is_overflow(&self) -> bool {
        self.current_quantity > self.initial_quantity
    }

    pub fn validate(&self, batch_id: BatchId) -> Result<()> {
        if self.initial_quantity < Decimal::ZERO {
            return Err(ShopError::InvalidQuantity(self.initial_quantity));
        }
        if self.current_quantity < Decimal::ZERO {
            return Err(ShopError::InvalidQuantity(self.current_quantity));
        }
        ensure_price(self.unit_cost)?;
        if self.is_overflow() && !self.confirm_overflow {
            return Err(ShopError::InconsistentCorrection {
                batch_id,
                initial: self.initial_quantity,
                current: self.current_quantity,
            });
        }
        Ok(())
    }
}

/// 扣庫記錄明細
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub batch_id: BatchId,
    pub quantity: Decimal,
}

/// 扣庫軌跡（用於精確回補）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionTrace {
    pub product_id: ProductId,
    pub entries: Vec<TraceEntry>,
}

impl ConsumptionTrace {
    pub fn new(product_id: ProductId) -> Self {
        Self {
            product_id,
            entries: Vec::new(),
        }
    }

    /// 記錄一筆扣除
    pub fn record(&mut self, batch_id: BatchId, quantity: Decimal) {
        self.entries.push(TraceEntry { batch_id, quantity });
    }

    /// 總扣除數量
    pub fn total(&self) -> Decimal {
        self.entries.iter().map(|e| e.quantity).sum()
    }
}
