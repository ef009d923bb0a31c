//! 時間區間模型

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{Result, ShopError};

/// 半開時間區間 `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeInterval {
    /// 創建時間區間，結束必須晚於開始
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        let interval = Self { start, end };
        interval.validate()?;
        Ok(interval)
    }

    pub fn validate(&self) -> Result<()> {
        if self.end <= self.start {
            return Err(ShopError::InvalidInterval {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// 兩區間是否重疊（相接不算重疊）
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// 時點是否落在區間內
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}
