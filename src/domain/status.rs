use serde::{Deserialize, Serialize};
use std::fmt;

/// Shipment lifecycle: pending -> label_created -> picked_up -> in_transit -> {delivered | failed}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Pending,
    LabelCreated,
    PickedUp,
    InTransit,
    Delivered,
    Failed,
}

impl ShipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::LabelCreated => "label_created",
            ShipmentStatus::PickedUp => "picked_up",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::Delivered => "delivered",
            ShipmentStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(ShipmentStatus::Pending),
            "label_created" => Some(ShipmentStatus::LabelCreated),
            "picked_up" => Some(ShipmentStatus::PickedUp),
            "in_transit" => Some(ShipmentStatus::InTransit),
            "delivered" => Some(ShipmentStatus::Delivered),
            "failed" => Some(ShipmentStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ShipmentStatus::Delivered | ShipmentStatus::Failed)
    }

    // Position along the forward path; both terminal states share the last slot.
    fn rank(&self) -> u8 {
        match self {
            ShipmentStatus::Pending => 0,
            ShipmentStatus::LabelCreated => 1,
            ShipmentStatus::PickedUp => 2,
            ShipmentStatus::InTransit => 3,
            ShipmentStatus::Delivered | ShipmentStatus::Failed => 4,
        }
    }

    /// Transitions an operator or integration may request directly: one step
    /// forward, or a jump to a terminal state from any non-terminal state.
    pub fn can_advance_to(&self, next: ShipmentStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next.is_terminal() {
            return true;
        }
        next.rank() == self.rank() + 1
    }

    /// New status implied by a carrier event, or `None` when the shipment keeps
    /// its current status. Terminal states are sticky.
    pub fn on_carrier_status(&self, canonical: CanonicalStatus) -> Option<ShipmentStatus> {
        if self.is_terminal() {
            return None;
        }
        match canonical {
            CanonicalStatus::Delivered => Some(ShipmentStatus::Delivered),
            CanonicalStatus::Failed => Some(ShipmentStatus::Failed),
            CanonicalStatus::InTransit => match self {
                ShipmentStatus::LabelCreated | ShipmentStatus::PickedUp => {
                    Some(ShipmentStatus::InTransit)
                }
                _ => None,
            },
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reduced status vocabulary every vendor status string is mapped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
    InTransit,
    Delivered,
    Failed,
}

impl CanonicalStatus {
    /// Vendor vocabulary table. Unlisted statuses map to `None` and never move
    /// the lifecycle.
    pub fn from_vendor(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "in_transit" | "transit" => Some(CanonicalStatus::InTransit),
            "delivered" => Some(CanonicalStatus::Delivered),
            "failed" | "failure" | "returned" => Some(CanonicalStatus::Failed),
            _ => None,
        }
    }

    pub fn as_shipment_status(&self) -> ShipmentStatus {
        match self {
            CanonicalStatus::InTransit => ShipmentStatus::InTransit,
            CanonicalStatus::Delivered => ShipmentStatus::Delivered,
            CanonicalStatus::Failed => ShipmentStatus::Failed,
        }
    }
}
