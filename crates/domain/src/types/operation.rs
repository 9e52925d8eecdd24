//! Operation kinds and their payload shapes
//!
//! Every mutation the outbox can carry is one variant of [`Operation`]. The
//! payload structs are transport shapes only; deciding whether a reading or a
//! transition is valid belongs to the remote system of record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Tag selecting a dispatcher handler
///
/// Persisted as `OutboxItem::operation_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    FermentationReading,
    BatchStatusTransition,
    InventoryConsumption,
    YeastLifecycleEvent,
}

crate::impl_domain_status_conversions!(OperationKind {
    FermentationReading => "fermentation_reading",
    BatchStatusTransition => "batch_status_transition",
    InventoryConsumption => "inventory_consumption",
    YeastLifecycleEvent => "yeast_lifecycle_event",
});

impl OperationKind {
    pub const ALL: [Self; 4] = [
        Self::FermentationReading,
        Self::BatchStatusTransition,
        Self::InventoryConsumption,
        Self::YeastLifecycleEvent,
    ];
}

/// Binds a payload shape to its operation kind at compile time.
pub trait OperationPayload: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: OperationKind;
}

/// Gravity/temperature sample taken from a fermenting batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FermentationReading {
    pub batch_id: String,
    pub gravity: f64,
    pub temperature_c: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph: Option<f64>,
    /// Epoch milliseconds
    pub recorded_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Batch moved from one production status to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStatusTransition {
    pub batch_id: String,
    pub from_status: String,
    pub to_status: String,
    pub changed_at: i64,
}

/// Stock drawn from inventory, optionally against a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryConsumption {
    pub inventory_item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    pub quantity: f64,
    pub unit: String,
    pub consumed_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YeastEvent {
    Pitched,
    Harvested,
    Discarded,
    Propagated,
}

crate::impl_domain_status_conversions!(YeastEvent {
    Pitched => "pitched",
    Harvested => "harvested",
    Discarded => "discarded",
    Propagated => "propagated",
});

/// Pitch, harvest, discard or propagation of a yeast culture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YeastLifecycleEvent {
    pub yeast_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    pub event: YeastEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<u32>,
    pub occurred_at: i64,
}

impl OperationPayload for FermentationReading {
    const KIND: OperationKind = OperationKind::FermentationReading;
}

impl OperationPayload for BatchStatusTransition {
    const KIND: OperationKind = OperationKind::BatchStatusTransition;
}

impl OperationPayload for InventoryConsumption {
    const KIND: OperationKind = OperationKind::InventoryConsumption;
}

impl OperationPayload for YeastLifecycleEvent {
    const KIND: OperationKind = OperationKind::YeastLifecycleEvent;
}

/// A mutation destined for the remote system of record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation_type", content = "payload", rename_all = "snake_case")]
pub enum Operation {
    FermentationReading(FermentationReading),
    BatchStatusTransition(BatchStatusTransition),
    InventoryConsumption(InventoryConsumption),
    YeastLifecycleEvent(YeastLifecycleEvent),
}

impl Operation {
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::FermentationReading(_) => OperationKind::FermentationReading,
            Self::BatchStatusTransition(_) => OperationKind::BatchStatusTransition,
            Self::InventoryConsumption(_) => OperationKind::InventoryConsumption,
            Self::YeastLifecycleEvent(_) => OperationKind::YeastLifecycleEvent,
        }
    }

    /// Payload as the opaque JSON stored on the outbox item.
    ///
    /// # Errors
    /// Returns the serializer error if a payload value cannot be encoded
    /// (for example a non-finite float).
    pub fn payload_value(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Self::FermentationReading(p) => serde_json::to_value(p),
            Self::BatchStatusTransition(p) => serde_json::to_value(p),
            Self::InventoryConsumption(p) => serde_json::to_value(p),
            Self::YeastLifecycleEvent(p) => serde_json::to_value(p),
        }
    }
}

macro_rules! impl_from_payload {
    ($($variant:ident),+ $(,)?) => {
        $(
            impl From<$variant> for Operation {
                fn from(payload: $variant) -> Self {
                    Self::$variant(payload)
                }
            }
        )+
    };
}

impl_from_payload!(
    FermentationReading,
    BatchStatusTransition,
    InventoryConsumption,
    YeastLifecycleEvent,
);
