//! 引擎配置模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Result, ShopError};

/// 到期提醒天數上限（十年）
pub const MAX_EXPIRY_WARNING_DAYS: u32 = 3650;

/// 維修廠引擎參數配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 診斷項目說明（每張評估單的第一項）
    pub diagnosis_description: String,

    /// 診斷項目預設價格
    pub default_diagnosis_price: Decimal,

    /// 產生工單時，是否回補未核准庫存項目已扣的數量
    pub release_unapproved_parts: bool,

    /// 評估單被拒絕時是否回補已扣庫存
    /// - false: 零件視為已使用／已訂購，不回補（預設）
    /// - true: 全數回補
    pub restore_parts_on_reject: bool,

    /// 到期提醒天數
    pub expiry_warning_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            diagnosis_description: "車輛診斷".to_string(),
            default_diagnosis_price: Decimal::ZERO,
            release_unapproved_parts: true,
            restore_parts_on_reject: false, // 預設不回補（保守策略）
            expiry_warning_days: 30,
        }
    }
}

impl EngineConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 從 JSON 載入配置（未提供的欄位使用預設值）
    ///
    /// # 範例
    /// ```
    /// # use shop_core::EngineConfig;
    /// let config = EngineConfig::from_json_str(r#"{ "expiry_warning_days": 14 }"#).unwrap();
    /// assert_eq!(config.expiry_warning_days, 14);
    /// assert!(config.release_unapproved_parts);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ShopError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 建構器模式：設置診斷項目
    pub fn with_diagnosis(mut self, description: String, price: Decimal) -> Self {
        self.diagnosis_description = description;
        self.default_diagnosis_price = price;
        self
    }

    /// 建構器模式：設置是否回補未核准零件
    pub fn with_release_unapproved_parts(mut self, release: bool) -> Self {
        self.release_unapproved_parts = release;
        self
    }

    /// 建構器模式：設置拒絕時是否回補
    pub fn with_restore_parts_on_reject(mut self, restore: bool) -> Self {
        self.restore_parts_on_reject = restore;
        self
    }

    /// 建構器模式：設置到期提醒天數
    pub fn with_expiry_warning_days(mut self, days: u32) -> Self {
        self.expiry_warning_days = days;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_diagnosis_price < Decimal::ZERO {
            return Err(ShopError::InvalidConfig(format!(
                "診斷預設價格不可為負數: {}",
                self.default_diagnosis_price
            )));
        }
        if self.diagnosis_description.trim().is_empty() {
            return Err(ShopError::InvalidConfig("診斷項目說明不可為空".to_string()));
        }
        if self.expiry_warning_days > MAX_EXPIRY_WARNING_DAYS {
            return Err(ShopError::InvalidConfig(format!(
                "到期提醒天數 {} 超過上限 {}",
                self.expiry_warning_days, MAX_EXPIRY_WARNING_DAYS
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::new();
        assert!(config.release_unapproved_parts);
        assert!(!config.restore_parts_on_reject);
        assert_eq!(config.expiry_warning_days, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::new()
            .with_diagnosis("全車檢查".to_string(), Decimal::from(80))
            .with_restore_parts_on_reject(true)
            .with_expiry_warning_days(7);

        assert_eq!(config.diagnosis_description, "全車檢查");
        assert_eq!(config.default_diagnosis_price, Decimal::from(80));
        assert!(config.restore_parts_on_reject);
        assert_eq!(config.expiry_warning_days, 7);
    }

    #[test]
    fn test_from_json_rejects_negative_price() {
        let err = EngineConfig::from_json_str(r#"{ "default_diagnosis_price": "-5" }"#)
            .unwrap_err();
        assert!(matches!(err, ShopError::InvalidConfig(_)));
    }

    #[test]
    fn test_from_json_rejects_out_of_range_warning_days() {
        let err = EngineConfig::from_json_str(r#"{ "expiry_warning_days": 4000000000 }"#)
            .unwrap_err();
        assert!(matches!(err, ShopError::InvalidConfig(_)));
        assert!(EngineConfig::new()
            .with_expiry_warning_days(MAX_EXPIRY_WARNING_DAYS)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_from_json_reports_malformed_input() {
        assert!(matches!(
            EngineConfig::from_json_str("{ not json"),
            Err(ShopError::InvalidConfig(_))
        ));
    }
}
