//! 評估單（診斷報價）模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::batch::ConsumptionTrace;
use crate::ids::{ClientId, EvaluationId, ProductId, VehicleId, WorkOrderId};
use crate::{Result, ShopError};

/// 評估單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    /// 草稿
    Draft,
    /// 已送出給客戶
    Sent,
    /// 已核准（終態）
    Approved,
    /// 已拒絕（終態）
    Rejected,
}

impl EvaluationStatus {
    pub const ALL: [EvaluationStatus; 4] = [
        EvaluationStatus::Draft,
        EvaluationStatus::Sent,
        EvaluationStatus::Approved,
        EvaluationStatus::Rejected,
    ];

    /// 允許的下一個狀態
    pub fn allowed_transitions(self) -> &'static [EvaluationStatus] {
        match self {
            EvaluationStatus::Draft => &[EvaluationStatus::Sent, EvaluationStatus::Rejected],
            EvaluationStatus::Sent => &[EvaluationStatus::Approved, EvaluationStatus::Rejected],
            EvaluationStatus::Approved | EvaluationStatus::Rejected => &[],
        }
    }

    pub fn can_transition_to(self, next: EvaluationStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// 是否為終態
    pub fn is_terminal(self) -> bool {
        matches!(self, EvaluationStatus::Approved | EvaluationStatus::Rejected)
    }

    /// 是否仍可編輯項目
    pub fn is_editable(self) -> bool {
        !self.is_terminal()
    }

    /// 是否佔用車輛（未被拒絕）
    pub fn occupies_vehicle(self) -> bool {
        self != EvaluationStatus::Rejected
    }
}

impl fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EvaluationStatus::Draft => "草稿",
            EvaluationStatus::Sent => "已送出",
            EvaluationStatus::Approved => "已核准",
            EvaluationStatus::Rejected => "已拒絕",
        };
        f.write_str(label)
    }
}

/// 項目來源
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemOrigin {
    /// 保留的診斷項目（第一項）
    Diagnosis,
    /// 手動輸入（工資等）
    Manual,
    /// 庫存零件，附扣庫軌跡
    Inventory {
        product_id: ProductId,
        quantity: Decimal,
        trace: ConsumptionTrace,
    },
    /// 外部供應商服務
    External { service_ref: String },
}

/// 評估單項目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    pub description: String,
    pub price: Decimal,
    pub approved: bool,
    pub origin: ItemOrigin,
}

impl LineItem {
    fn with_origin(description: String, price: Decimal, origin: ItemOrigin) -> Self {
        Self {
            id: Uuid::new_v4(),
            description,
            price,
            approved: false,
            origin,
        }
    }

    pub fn diagnosis(description: String, price: Decimal) -> Self {
        Self::with_origin(description, price, ItemOrigin::Diagnosis)
    }

    pub fn manual(description: String, price: Decimal) -> Self {
        Self::with_origin(description, price, ItemOrigin::Manual)
    }

    pub fn inventory(
        description: String,
        price: Decimal,
        product_id: ProductId,
        quantity: Decimal,
        trace: ConsumptionTrace,
    ) -> Self {
        Self::with_origin(
            description,
            price,
            ItemOrigin::Inventory {
                product_id,
                quantity,
                trace,
            },
        )
    }

    pub fn external(service_ref: String, price: Decimal) -> Self {
        Self::with_origin(
            format!("外部服務 {service_ref}"),
            price,
            ItemOrigin::External { service_ref },
        )
    }

    pub fn is_diagnosis(&self) -> bool {
        self.origin == ItemOrigin::Diagnosis
    }

    /// 庫存項目的扣庫軌跡
    pub fn consumption_trace(&self) -> Option<&ConsumptionTrace> {
        match &self.origin {
            ItemOrigin::Inventory { trace, .. } => Some(trace),
            _ => None,
        }
    }
}

/// 評估單合計
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    /// 全部項目報價
    pub quoted: Decimal,
    /// 已核准項目合計
    pub approved: Decimal,
}

/// 評估單
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: EvaluationId,
    pub client_id: ClientId,
    pub vehicle_id: VehicleId,

    /// 項目（第一項固定為診斷）
    pub items: Vec<LineItem>,

    pub notes: String,
    pub status: EvaluationStatus,

    /// 建立者
    pub created_by: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// 已產生的工單（一對一反向參照）
    pub work_order_id: Option<WorkOrderId>,
}

impl Evaluation {
    /// 創建草稿評估單
    pub fn new(client_id: ClientId, vehicle_id: VehicleId, diagnosis: LineItem) -> Self {
        let now = Utc::now();
        Self {
            id: EvaluationId::new(),
            client_id,
            vehicle_id,
            items: vec![diagnosis],
            notes: String::new(),
            status: EvaluationStatus::Draft,
            created_by: None,
            created_at: now,
            updated_at: now,
            work_order_id: None,
        }
    }

    /// 建構器模式：設置建立者
    pub fn with_created_by(mut self, user_id: String) -> Self {
        self.created_by = Some(user_id);
        self
    }

    /// 計算合計
    pub fn totals(&self) -> Totals {
        self.items.iter().fold(Totals::default(), |mut totals, item| {
            totals.quoted += item.price;
            if item.approved {
                totals.approved += item.price;
            }
            totals
        })
    }

    /// 已核准項目
    pub fn approved_items(&self) -> Vec<LineItem> {
        self.items.iter().filter(|i| i.approved).cloned().collect()
    }

    /// 狀態轉換（單向）
    pub fn transition_to(&mut self, next: EvaluationStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(ShopError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.touch();
        Ok(())
    }

    /// 確認仍可編輯
    pub fn ensure_editable(&self) -> Result<()> {
        if !self.status.is_editable() {
            return Err(ShopError::EvaluationLocked {
                evaluation_id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }

    pub fn item(&self, index: usize) -> Result<&LineItem> {
        self.items.get(index).ok_or(ShopError::ItemNotFound {
            evaluation_id: self.id,
            index,
        })
    }

    pub fn item_mut(&mut self, index: usize) -> Result<&mut LineItem> {
        let evaluation_id = self.id;
        self.items
            .get_mut(index)
            .ok_or(ShopError::ItemNotFound {
                evaluation_id,
                index,
            })
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
