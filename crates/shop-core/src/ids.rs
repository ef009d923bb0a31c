//! 實體識別碼

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// 產生新的識別碼
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id!(
    /// 商品ID
    ProductId
);
entity_id!(
    /// 批次ID
    BatchId
);
entity_id!(
    /// 評估單ID
    EvaluationId
);
entity_id!(
    /// 工單ID
    WorkOrderId
);
entity_id!(
    /// 預約時段ID
    SlotId
);
entity_id!(
    /// 客戶ID（外部系統）
    ClientId
);
entity_id!(
    /// 車輛ID（外部系統）
    VehicleId
);
entity_id!(
    /// 技師ID（外部系統）
    MechanicId
);
entity_id!(
    /// 可預約資源ID（外部發布的服務）
    ResourceId
);
