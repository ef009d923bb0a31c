//! 日誌初始化
//!
//! 以 `RUST_LOG` 環境變數控制等級，未設定時為 `info`。
//! 例如 `RUST_LOG=shop_engine=debug`。

use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日誌
///
/// ```no_run
/// workshop::logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();
}

/// 測試用日誌（debug 等級，輸出交給測試框架捕捉，可重複呼叫）
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
