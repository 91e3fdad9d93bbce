use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use stockledger_core::AlertId;

/// Kinds of notifications the service emits.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    ProductCreated,
    ProductUpdated,
    StockUpdated,
    #[serde(rename = "low-stock-alert")]
    LowStock,
}

impl AlertKind {
    /// Wire name, used as the detail type on the bus.
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::ProductCreated => "product-created",
            AlertKind::ProductUpdated => "product-updated",
            AlertKind::StockUpdated => "stock-updated",
            AlertKind::LowStock => "low-stock-alert",
        }
    }

    /// Catalog lifecycle alerts vs. stock-level alerts.
    pub fn is_inventory(self) -> bool {
        matches!(self, AlertKind::StockUpdated | AlertKind::LowStock)
    }
}

impl core::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope published on the alert bus.
///
/// `detail` is free-form JSON; its shape depends on `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    alert_id: AlertId,
    source: String,
    kind: AlertKind,
    detail: JsonValue,
    occurred_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(
        alert_id: AlertId,
        source: impl Into<String>,
        kind: AlertKind,
        detail: JsonValue,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            alert_id,
            source: source.into(),
            kind,
            detail,
            occurred_at,
        }
    }

    pub fn alert_id(&self) -> AlertId {
        self.alert_id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> AlertKind {
        self.kind
    }

    pub fn detail(&self) -> &JsonValue {
        &self.detail
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
