//! Domain records the genealogy engine reads and writes through
//! [`GenealogyStore`](crate::repositories::GenealogyStore).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Manufacturing category of a part number.
///
/// Unknown categories are kept verbatim in [`PartType::Other`] so new
/// categories can be recorded upstream without touching the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PartType {
    Assembly,
    Component,
    RawMaterial,
    Purchased,
    FinishedGood,
    MedicalDevice,
    Ic,
    Consumer,
    Other(String),
}

impl PartType {
    pub fn as_str(&self) -> &str {
        match self {
            PartType::Assembly => "ASSEMBLY",
            PartType::Component => "COMPONENT",
            PartType::RawMaterial => "RAW_MATERIAL",
            PartType::Purchased => "PURCHASED",
            PartType::FinishedGood => "FINISHED_GOOD",
            PartType::MedicalDevice => "MEDICAL_DEVICE",
            PartType::Ic => "IC",
            PartType::Consumer => "CONSUMER",
            PartType::Other(value) => value,
        }
    }
}

impl From<&str> for PartType {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "ASSEMBLY" => PartType::Assembly,
            "COMPONENT" => PartType::Component,
            "RAW_MATERIAL" => PartType::RawMaterial,
            "PURCHASED" => PartType::Purchased,
            "FINISHED_GOOD" => PartType::FinishedGood,
            "MEDICAL_DEVICE" => PartType::MedicalDevice,
            "IC" => PartType::Ic,
            "CONSUMER" => PartType::Consumer,
            _ => PartType::Other(value.to_string()),
        }
    }
}

impl From<String> for PartType {
    fn from(value: String) -> Self {
        PartType::from(value.as_str())
    }
}

impl From<PartType> for String {
    fn from(value: PartType) -> Self {
        match value {
            PartType::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for PartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of one physical unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SerializedPartStatus {
    Active,
    InProcess,
    Consumed,
    Recalled,
    Implanted,
    Shipped,
    Scrapped,
    Quarantined,
    Other(String),
}

impl SerializedPartStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SerializedPartStatus::Active => "ACTIVE",
            SerializedPartStatus::InProcess => "IN_PROCESS",
            SerializedPartStatus::Consumed => "CONSUMED",
            SerializedPartStatus::Recalled => "RECALLED",
            SerializedPartStatus::Implanted => "IMPLANTED",
            SerializedPartStatus::Shipped => "SHIPPED",
            SerializedPartStatus::Scrapped => "SCRAPPED",
            SerializedPartStatus::Quarantined => "QUARANTINED",
            SerializedPartStatus::Other(value) => value,
        }
    }
}

impl From<&str> for SerializedPartStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => SerializedPartStatus::Active,
            "IN_PROCESS" => SerializedPartStatus::InProcess,
            "CONSUMED" => SerializedPartStatus::Consumed,
            "RECALLED" => SerializedPartStatus::Recalled,
            "IMPLANTED" => SerializedPartStatus::Implanted,
            "SHIPPED" => SerializedPartStatus::Shipped,
            "SCRAPPED" => SerializedPartStatus::Scrapped,
            "QUARANTINED" => SerializedPartStatus::Quarantined,
            _ => SerializedPartStatus::Other(value.to_string()),
        }
    }
}

impl From<String> for SerializedPartStatus {
    fn from(value: String) -> Self {
        SerializedPartStatus::from(value.as_str())
    }
}

impl From<SerializedPartStatus> for String {
    fn from(value: SerializedPartStatus) -> Self {
        match value {
            SerializedPartStatus::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for SerializedPartStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Part-number-level definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: Uuid,
    pub part_number: String,
    pub part_name: String,
    pub part_type: PartType,
}

impl Part {
    pub fn new(
        part_number: impl Into<String>,
        part_name: impl Into<String>,
        part_type: PartType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            part_number: part_number.into(),
            part_name: part_name.into(),
            part_type,
        }
    }
}

/// One physical instance of a [`Part`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedPart {
    pub id: Uuid,
    pub serial_number: String,
    pub lot_number: Option<String>,
    pub status: SerializedPartStatus,
    pub work_order_id: Option<Uuid>,
    pub work_order_number: Option<String>,
    pub manufacture_date: Option<DateTime<Utc>>,
    pub customer_info: Option<String>,
    pub supplier: Option<String>,
    pub created_at: DateTime<Utc>,
    pub part: Part,
}

impl SerializedPart {
    /// New active unit of `part` with no lot, work order or supplier.
    pub fn new(serial_number: impl Into<String>, part: Part) -> Self {
        Self {
            id: Uuid::new_v4(),
            serial_number: serial_number.into(),
            lot_number: None,
            status: SerializedPartStatus::Active,
            work_order_id: None,
            work_order_number: None,
            manufacture_date: None,
            customer_info: None,
            supplier: None,
            created_at: Utc::now(),
            part,
        }
    }

    pub fn with_lot_number(mut self, lot_number: impl Into<String>) -> Self {
        self.lot_number = Some(lot_number.into());
        self
    }

    pub fn with_status(mut self, status: SerializedPartStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_work_order(mut self, id: Uuid, number: impl Into<String>) -> Self {
        self.work_order_id = Some(id);
        self.work_order_number = Some(number.into());
        self
    }

    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = Some(supplier.into());
        self
    }

    pub fn with_manufacture_date(mut self, date: DateTime<Utc>) -> Self {
        self.manufacture_date = Some(date);
        self
    }
}

/// Directed "component was assembled into parent" relationship.
///
/// `parent_part` / `component_part` are the resolved records; `None` means the
/// referenced row could not be loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenealogyEdge {
    pub id: Uuid,
    pub parent_part_id: Uuid,
    pub component_part_id: Uuid,
    pub assembly_date: Option<DateTime<Utc>>,
    pub assembly_operator: Option<String>,
    pub created_at: DateTime<Utc>,
    pub parent_part: Option<SerializedPart>,
    pub component_part: Option<SerializedPart>,
}

/// Input for persisting a new [`GenealogyEdge`]
#[derive(Debug, Clone, PartialEq)]
pub struct NewGenealogyEdge {
    pub parent_part_id: Uuid,
    pub component_part_id: Uuid,
    pub assembly_date: Option<DateTime<Utc>>,
    pub assembly_operator: Option<String>,
}

/// How a serial-number pattern query matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialMatchMode {
    StartsWith,
    Contains,
    EndsWith,
}

impl SerialMatchMode {
    pub fn matches(self, serial_number: &str, pattern: &str) -> bool {
        match self {
            SerialMatchMode::StartsWith => serial_number.starts_with(pattern),
            SerialMatchMode::Contains => serial_number.contains(pattern),
            SerialMatchMode::EndsWith => serial_number.ends_with(pattern),
        }
    }
}

impl fmt::Display for SerialMatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SerialMatchMode::StartsWith => "starts_with",
            SerialMatchMode::Contains => "contains",
            SerialMatchMode::EndsWith => "ends_with",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_type_parses_known_values_case_insensitively() {
        assert_eq!(PartType::from("raw_material"), PartType::RawMaterial);
        assert_eq!(PartType::from("PURCHASED"), PartType::Purchased);
        assert_eq!(PartType::from(" ic "), PartType::Ic);
    }

    #[test]
    fn unknown_part_type_is_preserved() {
        let part_type = PartType::from("FIRMWARE_IMAGE");
        assert_eq!(part_type, PartType::Other("FIRMWARE_IMAGE".into()));
        assert_eq!(String::from(part_type), "FIRMWARE_IMAGE");
    }

    #[test]
    fn status_serializes_as_upper_case_string() {
        let json = serde_json::to_string(&SerializedPartStatus::Implanted).unwrap();
        assert_eq!(json, "\"IMPLANTED\"");
        let parsed: SerializedPartStatus = serde_json::from_str("\"on_hold\"").unwrap();
        assert_eq!(parsed, SerializedPartStatus::Other("on_hold".into()));
    }

    #[test]
    fn match_modes() {
        assert!(SerialMatchMode::StartsWith.matches("SN-12345-001", "SN-12345"));
        assert!(SerialMatchMode::Contains.matches("XX-12345-001", "12345"));
        assert!(SerialMatchMode::EndsWith.matches("00012345", "12345"));
        assert!(!SerialMatchMode::EndsWith.matches("12345-001", "12345"));
    }
}
