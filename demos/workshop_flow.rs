//! 維修流程示例：進貨 → 預約 → 評估單 → 核准 → 工單

use chrono::NaiveDate;
use rust_decimal::Decimal;
use shop_core::{
    BatchReceipt, ClientId, EngineConfig, MechanicId, Product, ResourceId, Role, SessionContext,
    VehicleId, WorkOrderStatus,
};
use shop_engine::Workshop;

fn main() -> anyhow::Result<()> {
    workshop::logging::init();
    println!("=== 維修流程示例 ===\n");

    let config =
        EngineConfig::new().with_diagnosis("全車檢查".to_string(), Decimal::from(500));
    let shop = Workshop::new(config)?;
    let admin = SessionContext::admin("boss");
    let attendant = SessionContext::new("amy", Role::Attendant);

    // 進貨兩批同品項
    let oil = shop.ledger().register_product(
        Product::new("全合成機油 1L".to_string(), "OIL-5W30".to_string(), Decimal::from(350))
            .with_minimum_stock(Decimal::from(10)),
    )?;
    let day =
        |d| NaiveDate::from_ymd_opt(2025, 10, d).ok_or_else(|| anyhow::anyhow!("無效日期"));
    shop.receive_batch(
        &admin,
        oil.id,
        BatchReceipt::new(Decimal::from(5), Decimal::from(100), day(1)?),
    )?;
    shop.receive_batch(
        &admin,
        oil.id,
        BatchReceipt::new(Decimal::from(3), Decimal::from(120), day(5)?),
    )?;
    println!("機油庫存: {}", shop.ledger().available_quantity(oil.id)?);

    // 預約舉升機
    let lift = ResourceId::new();
    let start = day(20)?.and_hms_opt(9, 0, 0).ok_or_else(|| anyhow::anyhow!("無效時間"))?;
    let end = day(20)?.and_hms_opt(11, 0, 0).ok_or_else(|| anyhow::anyhow!("無效時間"))?;
    let slot = shop.calendar().commit_slot(lift, start, end)?;
    println!("預約時段: {} ~ {}", slot.occupancy.start, slot.occupancy.end);

    // 評估單
    let vehicle = VehicleId::new();
    let evaluation = shop.create_draft(&attendant, ClientId::new(), vehicle)?;
    let evaluations = shop.evaluations();
    evaluations.add_inventory_item(evaluation.id, oil.id, Decimal::from(4))?;
    evaluations.add_manual_item(evaluation.id, "更換機油工資".to_string(), Decimal::from(300))?;
    evaluations.add_external_item(evaluation.id, "鈑噴-0042".to_string(), Decimal::from(2000))?;
    for index in 0..3 {
        evaluations.set_approval(evaluation.id, index, true)?;
    }

    let totals = evaluations.compute_totals(evaluation.id)?;
    println!("報價合計: {}，核准合計: {}", totals.quoted, totals.approved);

    evaluations.submit(evaluation.id)?;
    let order = shop.approve(&attendant, evaluation.id)?;
    println!("\n工單 {}（{} 項，合計 {}）", order.id, order.items.len(), order.total());
    for item in &order.items {
        println!("  - {}: {}", item.description, item.price);
    }

    shop.tracker().assign_mechanic(order.id, Some(MechanicId::new()))?;
    let order = shop.tracker().update_status(order.id, WorkOrderStatus::InProgress)?;
    println!("工單狀態: {}", order.status);

    println!("\n庫存提醒:");
    for alert in shop.stock_alerts(day(15)?) {
        println!("  [{:?}] {}", alert.severity, alert.message);
    }

    Ok(())
}
