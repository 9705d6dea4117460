use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type RiderId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiderStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PayoutType {
    #[default]
    PerDelivery,
    PerKm,
    Hybrid,
}

impl PayoutType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutType::PerDelivery => "per_delivery",
            PayoutType::PerKm => "per_km",
            PayoutType::Hybrid => "hybrid",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "per_delivery" => Some(PayoutType::PerDelivery),
            "per_km" => Some(PayoutType::PerKm),
            "hybrid" => Some(PayoutType::Hybrid),
            _ => None,
        }
    }
}

/// Distance band a delivery falls into for rider pay reporting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PayoutSlab {
    #[serde(rename = "0-5km")]
    UpTo5Km,
    #[serde(rename = "5-10km")]
    UpTo10Km,
    #[serde(rename = "10+km")]
    Over10Km,
}

impl PayoutSlab {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutSlab::UpTo5Km => "0-5km",
            PayoutSlab::UpTo10Km => "5-10km",
            PayoutSlab::Over10Km => "10+km",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "0-5km" => Some(PayoutSlab::UpTo5Km),
            "5-10km" => Some(PayoutSlab::UpTo10Km),
            "10+km" => Some(PayoutSlab::Over10Km),
            _ => None,
        }
    }
}

impl fmt::Display for PayoutSlab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rider {
    pub id: RiderId,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub vehicle_number: Option<String>,
    #[serde(default)]
    pub status: RiderStatus,
    pub payout_type: PayoutType,
    #[serde(default)]
    pub per_delivery_rate: Decimal,
    #[serde(default)]
    pub per_km_rate: Decimal,
    #[serde(default)]
    pub base_rate: Decimal,
}

/// Pay computed for one delivery, stored on the delivery row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RiderPayout {
    pub amount: Decimal,
    pub slab: PayoutSlab,
    pub payout_type: PayoutType,
}
