//! # Workshop
//!
//! 汽車維修廠後端：零件批次庫存（FIFO）、服務預約、評估單報價與工單。
//!
//! 核心型別在 [`shop_core`]，並行引擎在 [`shop_engine`]。

pub mod logging;

pub use shop_core;
pub use shop_engine;

pub use shop_core::{Result, SessionContext, ShopError};
pub use shop_engine::Workshop;
