//! Alert emission boundary.
//!
//! Core services only see [`AlertEmitter`]. Emission is fire-and-forget from
//! their point of view: an `Err` here is logged by the caller and never undoes
//! a write that already happened.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;
use thiserror::Error;

use stockledger_core::AlertId;

use crate::alert::{Alert, AlertKind};
use crate::bus::EventBus;

pub const DEFAULT_CATALOG_SOURCE: &str = "stockledger.catalog";
pub const DEFAULT_INVENTORY_SOURCE: &str = "stockledger.inventory";

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert publication failed: {0}")]
    Publish(String),
}

pub trait AlertEmitter: Send + Sync {
    fn emit(&self, kind: AlertKind, detail: JsonValue) -> Result<(), AlertError>;
}

impl<E> AlertEmitter for Arc<E>
where
    E: AlertEmitter + ?Sized,
{
    fn emit(&self, kind: AlertKind, detail: JsonValue) -> Result<(), AlertError> {
        (**self).emit(kind, detail)
    }
}

/// Wraps alerts in an [`Alert`] envelope and publishes them on a bus.
#[derive(Debug)]
pub struct BusAlertEmitter<B> {
    bus: B,
    catalog_source: String,
    inventory_source: String,
}

impl<B> BusAlertEmitter<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            catalog_source: DEFAULT_CATALOG_SOURCE.to_string(),
            inventory_source: DEFAULT_INVENTORY_SOURCE.to_string(),
        }
    }

    pub fn with_sources(
        mut self,
        catalog_source: impl Into<String>,
        inventory_source: impl Into<String>,
    ) -> Self {
        self.catalog_source = catalog_source.into();
        self.inventory_source = inventory_source.into();
        self
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    fn source_for(&self, kind: AlertKind) -> &str {
        if kind.is_inventory() {
            &self.inventory_source
        } else {
            &self.catalog_source
        }
    }
}

impl<B> AlertEmitter for BusAlertEmitter<B>
where
    B: EventBus<Alert>,
{
    fn emit(&self, kind: AlertKind, detail: JsonValue) -> Result<(), AlertError> {
        let alert = Alert::new(
            AlertId::new(),
            self.source_for(kind),
            kind,
            detail,
            Utc::now(),
        );
        tracing::debug!(alert_id = %alert.alert_id(), kind = %kind, "publishing alert");
        self.bus
            .publish(alert)
            .map_err(|e| AlertError::Publish(format!("{e:?}")))
    }
}

/// Drops every alert. For wiring where no bus is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAlertEmitter;

impl AlertEmitter for NoopAlertEmitter {
    fn emit(&self, _kind: AlertKind, _detail: JsonValue) -> Result<(), AlertError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryEventBus;
    use serde_json::json;

    #[test]
    fn routes_sources_by_alert_kind() {
        let bus = Arc::new(InMemoryEventBus::<Alert>::new());
        let sub = bus.subscribe();
        let emitter = BusAlertEmitter::new(bus.clone()).with_sources("cat", "inv");

        emitter.emit(AlertKind::ProductCreated, json!({"product_id": "p1"})).unwrap();
        emitter.emit(AlertKind::LowStock, json!({"product_id": "p1"})).unwrap();

        let alerts = sub.drain();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].source(), "cat");
        assert_eq!(alerts[0].kind(), AlertKind::ProductCreated);
        assert_eq!(alerts[1].source(), "inv");
        assert_eq!(alerts[1].detail()["product_id"], "p1");
    }
}
