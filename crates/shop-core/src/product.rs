//! 商品模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::ProductId;

/// 商品（目錄項目）
///
/// 商品本身不記錄數量，庫存由其有效批次加總得出。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// 商品ID
    pub id: ProductId,

    /// 名稱
    pub name: String,

    /// 料號（唯一）
    pub sku: String,

    /// 分類
    pub category: Option<String>,

    /// 儲位
    pub location: Option<String>,

    /// 售價（單位）
    pub sale_price: Decimal,

    /// 最低庫存（低於此值發出補貨提醒）
    pub minimum_stock: Decimal,

    /// 建立時間
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// 創建新的商品
    pub fn new(name: String, sku: String, sale_price: Decimal) -> Self {
        Self {
            id: ProductId::new(),
            name,
            sku,
            category: None,
            location: None,
            sale_price,
            minimum_stock: Decimal::ZERO,
            created_at: Utc::now(),
        }
    }

    /// 建構器模式：設置分類
    pub fn with_category(mut self, category: String) -> Self {
        self.category = Some(category);
        self
    }

    /// 建構器模式：設置儲位
    pub fn with_location(mut self, location: String) -> Self {
        self.location = Some(location);
        self
    }

    /// 建構器模式：設置最低庫存
    pub fn with_minimum_stock(mut self, minimum_stock: Decimal) -> Self {
        self.minimum_stock = minimum_stock;
        self
    }

    /// 檢查可用數量是否低於最低庫存
    pub fn is_below_minimum(&self, available: Decimal) -> bool {
        available < self.minimum_stock
    }

    /// 獲取需要補充的數量
    pub fn replenishment_needed(&self, available: Decimal) -> Decimal {
        if self.is_below_minimum(available) {
            self.minimum_stock - available
        } else {
            Decimal::ZERO
        }
    }

    /// 套用資料更新
    pub fn apply(&mut self, update: ProductUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(sku) = update.sku {
            self.sku = sku;
        }
        if let Some(category) = update.category {
            self.category = Some(category);
        }
        if let Some(location) = update.location {
            self.location = Some(location);
        }
        if let Some(price) = update.sale_price {
            self.sale_price = price;
        }
        if let Some(minimum) = update.minimum_stock {
            self.minimum_stock = minimum;
        }
    }
}

/// 商品資料更新（僅更新有值的欄位）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub sale_price: Option<Decimal>,
    pub minimum_stock: Option<Decimal>,
}
