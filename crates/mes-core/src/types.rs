use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::MesError;

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a work order.
///
/// `Planned` is the state on creation; the other five are reached through
/// progress advances and map one-to-one onto operation steps 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "S0_PLANNED")]
    Planned,
    #[serde(rename = "S1_READY")]
    Ready,
    #[serde(rename = "S2_ASSEMBLY")]
    Assembly,
    #[serde(rename = "S3_INSPECTION")]
    Inspection,
    #[serde(rename = "S4_PACK")]
    Pack,
    #[serde(rename = "S5_DONE")]
    Done,
}

impl OrderStatus {
    pub fn all() -> &'static [OrderStatus] {
        &[
            OrderStatus::Planned,
            OrderStatus::Ready,
            OrderStatus::Assembly,
            OrderStatus::Inspection,
            OrderStatus::Pack,
            OrderStatus::Done,
        ]
    }

    /// Step number this status corresponds to; 0 for `Planned`.
    pub fn step(self) -> u8 {
        self as u8
    }

    pub fn from_step(step: u8) -> Option<OrderStatus> {
        match step {
            1..=5 => Self::all().get(step as usize).copied(),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Done)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Planned => "S0_PLANNED",
            OrderStatus::Ready => "S1_READY",
            OrderStatus::Assembly => "S2_ASSEMBLY",
            OrderStatus::Inspection => "S3_INSPECTION",
            OrderStatus::Pack => "S4_PACK",
            OrderStatus::Done => "S5_DONE",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = MesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "S0_PLANNED" => Ok(OrderStatus::Planned),
            "S1_READY" => Ok(OrderStatus::Ready),
            "S2_ASSEMBLY" => Ok(OrderStatus::Assembly),
            "S3_INSPECTION" => Ok(OrderStatus::Inspection),
            "S4_PACK" => Ok(OrderStatus::Pack),
            "S5_DONE" => Ok(OrderStatus::Done),
            _ => Err(MesError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// OperationSeq
// ---------------------------------------------------------------------------

/// A manufacturing step number, always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct OperationSeq(u8);

impl OperationSeq {
    pub const FIRST: OperationSeq = OperationSeq(1);
    pub const LAST: OperationSeq = OperationSeq(5);

    pub fn new(step: i64) -> Result<Self, MesError> {
        match u8::try_from(step) {
            Ok(n @ 1..=5) => Ok(OperationSeq(n)),
            _ => Err(MesError::InvalidOperationSeq(step.to_string())),
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// The status an order enters when this step is recorded.
    pub fn status(self) -> OrderStatus {
        match self.0 {
            1 => OrderStatus::Ready,
            2 => OrderStatus::Assembly,
            3 => OrderStatus::Inspection,
            4 => OrderStatus::Pack,
            _ => OrderStatus::Done,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::LAST
    }
}

impl TryFrom<i64> for OperationSeq {
    type Error = MesError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        OperationSeq::new(value)
    }
}

impl From<OperationSeq> for i64 {
    fn from(seq: OperationSeq) -> i64 {
        seq.0 as i64
    }
}

impl fmt::Display for OperationSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for OperationSeq {
    type Err = MesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: i64 = s
            .trim()
            .parse()
            .map_err(|_| MesError::InvalidOperationSeq(s.to_string()))?;
        OperationSeq::new(n)
    }
}

// ---------------------------------------------------------------------------
// InspectionStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionStatus {
    Pending,
    Completed,
}

impl InspectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InspectionStatus::Pending => "PENDING",
            InspectionStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for InspectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InspectionStatus {
    type Err = MesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(InspectionStatus::Pending),
            "COMPLETED" => Ok(InspectionStatus::Completed),
            _ => Err(MesError::InvalidStatus(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_mapping_is_fixed() {
        let expected = [
            (1, OrderStatus::Ready),
            (2, OrderStatus::Assembly),
            (3, OrderStatus::Inspection),
            (4, OrderStatus::Pack),
            (5, OrderStatus::Done),
        ];
        for (n, status) in expected {
            let seq = OperationSeq::new(n).unwrap();
            assert_eq!(seq.status(), status);
            assert_eq!(status.step() as i64, n);
            assert_eq!(OrderStatus::from_step(n as u8), Some(status));
        }
    }

    #[test]
    fn planned_has_no_step() {
        assert_eq!(OrderStatus::Planned.step(), 0);
        assert_eq!(OrderStatus::from_step(0), None);
        assert_eq!(OrderStatus::from_step(6), None);
    }

    #[test]
    fn operation_seq_rejects_out_of_range() {
        assert!(OperationSeq::new(0).is_err());
        assert!(OperationSeq::new(6).is_err());
        assert!(OperationSeq::new(-1).is_err());
        assert!(OperationSeq::new(300).is_err());
    }

    #[test]
    fn operation_seq_parses_numeric_strings() {
        assert_eq!("3".parse::<OperationSeq>().unwrap().get(), 3);
        assert_eq!(" 5 ".parse::<OperationSeq>().unwrap().get(), 5);
        assert!(matches!(
            "three".parse::<OperationSeq>(),
            Err(MesError::InvalidOperationSeq(s)) if s == "three"
        ));
        assert!("2.5".parse::<OperationSeq>().is_err());
    }

    #[test]
    fn status_labels_roundtrip() {
        for &status in OrderStatus::all() {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert!("DONE".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn operation_seq_deserializes_from_json_number() {
        let seq: OperationSeq = serde_json::from_str("4").unwrap();
        assert_eq!(seq.get(), 4);
        assert!(serde_json::from_str::<OperationSeq>("9").is_err());
    }
}
