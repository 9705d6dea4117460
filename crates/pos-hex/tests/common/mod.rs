#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use pos_hex::application::PosServices;
use pos_hex::config::Config;
use pos_types::domain::delivery::DeliveryDraft;
use pos_types::domain::order::{ItemDraft, OrderDraft, OrderType};
use pos_types::domain::rider::{PayoutType, Rider, RiderStatus};
use pos_types::ports::clock::ManualClock;
use pos_types::ports::random::SeededRandom;
use pos_types::ports::transition::PosStore;
use rust_decimal::Decimal;
use std::sync::Arc;

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 10, 18, 13, 0, 0).unwrap(),
    ))
}

pub fn services<S: PosStore>(store: Arc<S>, clock: Arc<ManualClock>) -> PosServices<S> {
    PosServices::new(
        store,
        clock,
        Arc::new(SeededRandom::new(7)),
        &Config::default(),
    )
}

pub fn dine_in() -> OrderDraft {
    OrderDraft {
        order_type: OrderType::DineIn,
        items: vec![ItemDraft {
            product_name: "Nihari".into(),
            quantity: 1,
            unit_price: Decimal::from(900),
            cost_price: Some(Decimal::from(400)),
        }],
        delivery_charge: Decimal::ZERO,
        discount: Decimal::ZERO,
        tax: Decimal::from(72),
        payment_status: Default::default(),
        payment_type: Default::default(),
        cashier_id: Some(12),
        cooking_eta_minutes: None,
        delivery_eta_minutes: None,
        delivery: None,
    }
}

pub fn delivery(distance_km: i64) -> OrderDraft {
    OrderDraft {
        order_type: OrderType::Delivery,
        delivery_charge: Decimal::from(150),
        delivery: Some(DeliveryDraft {
            customer_name: "Hamza".into(),
            customer_phone: "0345-1234567".into(),
            address: "22-B Johar Town".into(),
            location_name: "Johar Town".into(),
            distance_km: Decimal::from(distance_km),
            is_free_delivery: false,
            special_instructions: Some("Leave at the gate".into()),
        }),
        ..dine_in()
    }
}

pub fn per_km_rider(id: i64) -> Rider {
    Rider {
        id,
        name: "Usman".into(),
        phone: "0301-9876543".into(),
        vehicle_number: Some("LED-4521".into()),
        status: RiderStatus::Active,
        payout_type: PayoutType::PerKm,
        per_delivery_rate: Decimal::ZERO,
        per_km_rate: Decimal::from(10),
        base_rate: Decimal::from(20),
    }
}
