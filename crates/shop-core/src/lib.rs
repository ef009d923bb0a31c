//! # Shop Core
//!
//! 核心資料模型與類型定義（庫存批次、評估單、工單、預約時段）

pub mod batch;
pub mod config;
pub mod evaluation;
pub mod ids;
pub mod interval;
pub mod product;
pub mod session;
pub mod work_order;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

// Re-export 主要類型
pub use batch::{Batch, BatchCorrection, BatchReceipt, ConsumptionTrace, TraceEntry};
pub use config::{EngineConfig, MAX_EXPIRY_WARNING_DAYS};
pub use evaluation::{Evaluation, EvaluationStatus, ItemOrigin, LineItem, Totals};
pub use ids::{
    BatchId, ClientId, EvaluationId, MechanicId, ProductId, ResourceId, SlotId, VehicleId,
    WorkOrderId,
};
pub use interval::TimeInterval;
pub use product::{Product, ProductUpdate};
pub use session::{Role, SessionContext};
pub use work_order::{WorkOrder, WorkOrderFilter, WorkOrderStatus};

/// 維修廠引擎錯誤類型
///
/// 除 `NotFound` 外皆為預期中的業務狀況，呼叫端必須處理。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShopError {
    #[error("數量必須大於零: {0}")]
    InvalidQuantity(Decimal),

    #[error("金額不可為負數: {0}")]
    InvalidPrice(Decimal),

    #[error("庫存不足：商品 {product_id} 需要 {requested}, 可用 {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: Decimal,
        available: Decimal,
    },

    #[error("找不到批次: {0}")]
    BatchNotFound(BatchId),

    #[error("批次 {batch_id} 修正不一致：現有數量 {current} 超過初始數量 {initial}，需明確確認")]
    InconsistentCorrection {
        batch_id: BatchId,
        initial: Decimal,
        current: Decimal,
    },

    #[error("無效的時間區間: {start} ~ {end}（結束必須晚於開始）")]
    InvalidInterval {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("資源 {resource} 的時段與已預約時段 {with} 重疊")]
    SlotConflict { resource: String, with: SlotId },

    #[error("車輛 {vehicle_id} 已有進行中的評估單 {evaluation_id}")]
    VehicleBusy {
        vehicle_id: VehicleId,
        evaluation_id: EvaluationId,
    },

    #[error("評估單 {evaluation_id} 尚未核准（目前狀態: {status}）")]
    NotApproved {
        evaluation_id: EvaluationId,
        status: EvaluationStatus,
    },

    #[error("評估單 {evaluation_id} 已產生工單 {work_order_id}")]
    AlreadyGenerated {
        evaluation_id: EvaluationId,
        work_order_id: WorkOrderId,
    },

    #[error("無效的狀態轉換: {from} → {to}")]
    InvalidTransition {
        from: EvaluationStatus,
        to: EvaluationStatus,
    },

    #[error("評估單 {evaluation_id} 狀態為 {status}，項目已鎖定")]
    EvaluationLocked {
        evaluation_id: EvaluationId,
        status: EvaluationStatus,
    },

    #[error("診斷項目不可移除或變更類型，只能調整價格")]
    DiagnosisItemProtected,

    #[error("評估單 {evaluation_id} 沒有第 {index} 個項目")]
    ItemNotFound {
        evaluation_id: EvaluationId,
        index: usize,
    },

    #[error("SKU 已存在: {0}")]
    DuplicateSku(String),

    #[error("商品已登錄: {0}")]
    DuplicateProduct(ProductId),

    #[error("角色 {role} 無權執行: {action}")]
    Forbidden { action: &'static str, role: Role },

    #[error("無效的配置: {0}")]
    InvalidConfig(String),

    #[error("找不到{entity}: {id}")]
    NotFound { entity: &'static str, id: String },
}

impl ShopError {
    /// 建立 `NotFound` 錯誤
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// 是否為參照不存在的實體（對應 404）
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::BatchNotFound(_) | Self::ItemNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ShopError>;

/// 檢查數量是否大於零
pub fn ensure_positive_quantity(quantity: Decimal) -> Result<()> {
    if quantity <= Decimal::ZERO {
        return Err(ShopError::InvalidQuantity(quantity));
    }
    Ok(())
}

/// 檢查金額是否非負
pub fn ensure_price(price: Decimal) -> Result<()> {
    if price < Decimal::ZERO {
        return Err(ShopError::InvalidPrice(price));
    }
    Ok(())
}
