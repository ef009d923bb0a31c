//! 操作者情境

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Result, ShopError};

/// 使用者角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// 管理者
    Admin,
    /// 櫃台接待
    Attendant,
    /// 技師
    Mechanic,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::Admin => "管理者",
            Role::Attendant => "櫃台",
            Role::Mechanic => "技師",
        };
        f.write_str(label)
    }
}

/// 呼叫引擎時明確傳入的操作者情境
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: String,
    pub role: Role,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// 要求管理者權限
    pub fn require_admin(&self, action: &'static str) -> Result<()> {
        if !self.is_admin() {
            return Err(ShopError::Forbidden {
                action,
                role: self.role,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_admin() {
        assert!(SessionContext::admin("boss").require_admin("刪除批次").is_ok());

        let err = SessionContext::new("amy", Role::Attendant)
            .require_admin("刪除批次")
            .unwrap_err();
        assert_eq!(
            err,
            ShopError::Forbidden {
                action: "刪除批次",
                role: Role::Attendant,
            }
        );
        assert_eq!(err.to_string(), "角色 櫃台 無權執行: 刪除批次");
    }
}
