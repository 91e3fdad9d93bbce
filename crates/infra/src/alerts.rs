//! Alert payloads and best-effort emission.

use chrono::Utc;
use serde_json::{Value as JsonValue, json};

use stockledger_events::{AlertEmitter, AlertKind};
use stockledger_products::Product;

/// Emit an alert; failures are logged and dropped.
pub(crate) fn emit_best_effort<A>(alerts: &A, kind: AlertKind, detail: JsonValue)
where
    A: AlertEmitter + ?Sized,
{
    if let Err(err) = alerts.emit(kind, detail) {
        tracing::warn!(kind = %kind, error = %err, "alert emission failed; continuing");
    }
}

pub(crate) fn stock_updated(product: &Product, delta: i64, total: i64, remarks: &str) -> JsonValue {
    json!({
        "product_id": product.product_id(),
        "product_name": product.product_name(),
        "delta": delta,
        "total_quantity": total,
        "remarks": remarks,
        "timestamp": Utc::now(),
    })
}

pub(crate) fn low_stock(product: &Product, current_quantity: i64, threshold: i64) -> JsonValue {
    json!({
        "product_id": product.product_id(),
        "product_name": product.product_name(),
        "current_quantity": current_quantity,
        "threshold": threshold,
        "timestamp": Utc::now(),
    })
}

pub(crate) fn product_snapshot(product: &Product) -> JsonValue {
    json!({
        "product_id": product.product_id(),
        "product_name": product.product_name(),
        "price": product.price(),
        "quantity": product.quantity(),
        "timestamp": Utc::now(),
    })
}
