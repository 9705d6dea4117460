//! Rider pay for a single delivery.
//!
//! `hybrid` is read as both flat components plus the distance component:
//! `base_rate + per_delivery_rate + per_km_rate * km`.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::rider::{PayoutSlab, PayoutType, Rider, RiderPayout};

const DECIMAL_PLACES: u32 = 2;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PayoutError {
    #[error("distance must be non-negative, got {0} km")]
    NegativeDistance(Decimal),
}

fn check_distance(distance_km: Decimal) -> Result<(), PayoutError> {
    if distance_km.is_sign_negative() && !distance_km.is_zero() {
        return Err(PayoutError::NegativeDistance(distance_km));
    }
    Ok(())
}

pub fn calculate_pay(rider: &Rider, distance_km: Decimal) -> Result<Decimal, PayoutError> {
    check_distance(distance_km)?;
    let amount = match rider.payout_type {
        PayoutType::PerDelivery => rider.per_delivery_rate,
        PayoutType::PerKm => rider.base_rate + rider.per_km_rate * distance_km,
        PayoutType::Hybrid => {
            rider.base_rate + rider.per_delivery_rate + rider.per_km_rate * distance_km
        }
    };
    Ok(amount
        .max(Decimal::ZERO)
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero))
}

pub fn determine_slab(distance_km: Decimal) -> Result<PayoutSlab, PayoutError> {
    check_distance(distance_km)?;
    Ok(if distance_km <= Decimal::from(5) {
        PayoutSlab::UpTo5Km
    } else if distance_km <= Decimal::from(10) {
        PayoutSlab::UpTo10Km
    } else {
        PayoutSlab::Over10Km
    })
}

pub fn compute_payout(rider: &Rider, distance_km: Decimal) -> Result<RiderPayout, PayoutError> {
    Ok(RiderPayout {
        amount: calculate_pay(rider, distance_km)?,
        slab: determine_slab(distance_km)?,
        payout_type: rider.payout_type,
    })
}
