//! # Shop Engine
//!
//! 庫存批次帳、預約行事曆、評估單引擎、工單產生與追蹤

pub mod booking;
pub mod evaluation;
pub mod ledger;
pub mod occupancy;
pub mod order_generator;
pub mod tracker;
pub mod workshop;

use serde::{Deserialize, Serialize};
use shop_core::ProductId;

// Re-export 主要類型
pub use booking::{BookingCalendar, ServiceSlot, VehicleOccupancy};
pub use evaluation::EvaluationEngine;
pub use ledger::StockLedger;
pub use occupancy::{Booking, Commit, EvaluationClaim, Occupancy, OccupancyCalendar, Proposal};
pub use order_generator::OrderGenerator;
pub use tracker::WorkOrderTracker;
pub use workshop::Workshop;

/// 庫存提醒
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAlert {
    pub product_id: ProductId,
    pub message: String,
    pub severity: AlertSeverity,
}

impl StockAlert {
    pub fn new(product_id: ProductId, message: String, severity: AlertSeverity) -> Self {
        Self {
            product_id,
            message,
            severity,
        }
    }

    pub fn info(product_id: ProductId, message: String) -> Self {
        Self::new(product_id, message, AlertSeverity::Info)
    }

    pub fn warning(product_id: ProductId, message: String) -> Self {
        Self::new(product_id, message, AlertSeverity::Warning)
    }

    pub fn error(product_id: ProductId, message: String) -> Self {
        Self::new(product_id, message, AlertSeverity::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
}
