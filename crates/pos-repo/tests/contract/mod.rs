//! Behaviour every storage backend has to share.

use chrono::{Duration, TimeZone, Utc};
use pos_types::domain::audit::{NewAuditRecord, Source};
use pos_types::domain::delivery::{DeliveryChange, DeliveryDraft, DeliveryStatus, NewDelivery};
use pos_types::domain::order::{ItemDraft, NewOrder, OrderDraft, OrderType, StatusFields};
use pos_types::domain::rider::{PayoutSlab, PayoutType, Rider, RiderPayout, RiderStatus};
use pos_types::domain::status::{LifecycleField, OrderStatus, StoredStatus};
use pos_types::ports::audit_log::AuditLog;
use pos_types::ports::delivery_store::DeliveryStore;
use pos_types::ports::order_store::{OrderStore, RepoError};
use pos_types::ports::rider_directory::RiderDirectory;
use pos_types::ports::transition::{OrderIntake, PosStore, TransitionCommit, TransitionWriter};
use rust_decimal::Decimal;

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 9, 20, 15, 0).unwrap()
}

fn delivery_draft() -> DeliveryDraft {
    DeliveryDraft {
        customer_name: "Zara".into(),
        customer_phone: "0312-4445566".into(),
        address: "7 Canal View".into(),
        location_name: "Canal View".into(),
        distance_km: Decimal::new(125, 1),
        is_free_delivery: false,
        special_instructions: None,
    }
}

fn new_order(number: &str) -> NewOrder {
    let draft = OrderDraft {
        order_type: OrderType::Delivery,
        items: vec![ItemDraft {
            product_name: "Chapli Kabab".into(),
            quantity: 3,
            unit_price: Decimal::new(3499, 1),
            cost_price: Some(Decimal::from(150)),
        }],
        delivery_charge: Decimal::from(200),
        discount: Decimal::from(50),
        tax: Decimal::ZERO,
        payment_status: Default::default(),
        payment_type: Default::default(),
        cashier_id: Some(4),
        cooking_eta_minutes: None,
        delivery_eta_minutes: None,
        delivery: Some(delivery_draft()),
    };
    NewOrder::from_draft(&draft, number.into(), now()).unwrap()
}

fn audit(order_id: i64, from: StoredStatus, to: OrderStatus) -> NewAuditRecord {
    NewAuditRecord {
        order_id,
        status_from: from,
        status_to: to,
        source: Source::Kds,
        actor_user_id: 9,
        notes: None,
        created_at: now(),
    }
}

pub async fn orders_round_trip<S: PosStore>(repo: &S) {
    let created = repo.create(new_order("ORD-1")).await.unwrap();
    let fetched = repo.get(created.id).await.unwrap().unwrap();
    assert_eq!(fetched, created);
    assert_eq!(fetched.subtotal, Decimal::new(10497, 1));
    assert_eq!(fetched.items[0].cost_price, Some(Decimal::from(150)));
    assert_eq!(fetched.status, OrderStatus::Pending);

    let second = repo.create(new_order("ORD-2")).await.unwrap();
    let ids: Vec<_> = repo.list().await.unwrap().iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![created.id, second.id]);
    assert!(repo.get(second.id + 100).await.unwrap().is_none());
}

pub async fn legacy_status_loads_as_invalid<S: PosStore>(repo: &S) {
    let mut order = new_order("ORD-OLD");
    order.status = StoredStatus::Invalid("out_for_delivery".into());
    let created = repo.create(order).await.unwrap();
    let fetched = repo.get(created.id).await.unwrap().unwrap();
    assert_eq!(
        fetched.status,
        StoredStatus::Invalid("out_for_delivery".into())
    );
    assert_eq!(fetched.status.normalized(), OrderStatus::Dispatched);
}

pub async fn tracking_tokens_are_unique<S: PosStore>(repo: &S) {
    let a = repo.create(new_order("ORD-A")).await.unwrap();
    let b = repo.create(new_order("ORD-B")).await.unwrap();
    let token = "0123456789abcdef0123456789abcdef";

    assert!(repo.set_tracking_token(a.id, token).await.unwrap());
    assert_eq!(
        repo.get_by_tracking_token(token).await.unwrap().unwrap().id,
        a.id
    );
    let clash = repo.set_tracking_token(b.id, token).await;
    assert!(matches!(clash, Err(RepoError::Conflict(_))));
    assert_eq!(repo.get(b.id).await.unwrap().unwrap().tracking_token, None);

    let replacement = "fedcba9876543210fedcba9876543210";
    assert!(repo.set_tracking_token(a.id, replacement).await.unwrap());
    assert!(repo.get_by_tracking_token(token).await.unwrap().is_none());
    assert!(!repo.set_tracking_token(b.id + 100, "aa".repeat(16).as_str()).await.unwrap());
}

pub async fn status_fields_keep_stamps<S: PosStore>(repo: &S) {
    let order = repo.create(new_order("ORD-S")).await.unwrap();
    let cooking_at = now() + Duration::minutes(4);
    let updated = repo
        .update_status_fields(
            order.id,
            &StatusFields {
                status: OrderStatus::Cooking,
                updated_at: cooking_at,
                stamp: Some((LifecycleField::CookingStartedAt, cooking_at)),
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.cooking_started_at, Some(cooking_at));

    let cancelled = repo
        .update_status_fields(
            order.id,
            &StatusFields {
                status: OrderStatus::Cancelled,
                updated_at: cooking_at + Duration::minutes(1),
                stamp: None,
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.cooking_started_at, Some(cooking_at));
    assert_eq!(cancelled.updated_at, cooking_at + Duration::minutes(1));
}

pub async fn deliveries_and_riders<S: PosStore>(repo: &S) {
    let order = repo.create(new_order("ORD-D")).await.unwrap();
    let delivery = repo
        .create_delivery(NewDelivery::from_draft(
            order.id,
            &delivery_draft(),
            order.delivery_charge,
            now(),
        ))
        .await
        .unwrap();
    assert_eq!(delivery.status, DeliveryStatus::Pending);
    assert_eq!(repo.get_by_order_id(order.id).await.unwrap().unwrap(), delivery);

    let rider = repo
        .save_rider(Rider {
            id: 21,
            name: "Kamran".into(),
            phone: "0322-0001112".into(),
            vehicle_number: None,
            status: RiderStatus::Active,
            payout_type: PayoutType::Hybrid,
            per_delivery_rate: Decimal::from(30),
            per_km_rate: Decimal::new(75, 1),
            base_rate: Decimal::from(10),
        })
        .await
        .unwrap();
    assert_eq!(repo.get_rider(21).await.unwrap().unwrap(), rider);

    let payout = RiderPayout {
        amount: Decimal::new(13375, 2),
        slab: PayoutSlab::Over10Km,
        payout_type: PayoutType::Hybrid,
    };
    assert!(repo
        .update_rider_assignment(delivery.id, 21, &payout)
        .await
        .unwrap());
    let delivered_at = now() + Duration::minutes(40);
    assert!(repo
        .update_delivery_status(delivery.id, DeliveryStatus::Delivered, Some(delivered_at))
        .await
        .unwrap());

    let stored = repo.get_by_order_id(order.id).await.unwrap().unwrap();
    assert_eq!(stored.assigned_rider_id, Some(21));
    assert_eq!(stored.rider_pay_amount, Some(Decimal::new(13375, 2)));
    assert_eq!(stored.rider_pay_slab, Some(PayoutSlab::Over10Km));
    assert_eq!(stored.status, DeliveryStatus::Delivered);
    assert_eq!(stored.delivered_at, Some(delivered_at));

    let duplicate = repo
        .create_delivery(NewDelivery::from_draft(
            order.id,
            &delivery_draft(),
            order.delivery_charge,
            now(),
        ))
        .await;
    assert!(matches!(duplicate, Err(RepoError::Conflict(_))));
}

pub async fn audit_is_append_only_and_ordered<S: PosStore>(repo: &S) {
    let order = repo.create(new_order("ORD-L")).await.unwrap();
    let first = repo
        .append(audit(order.id, OrderStatus::Pending.into(), OrderStatus::Confirmed))
        .await
        .unwrap();
    let second = repo
        .append(audit(
            order.id,
            StoredStatus::Invalid("new".into()),
            OrderStatus::Pending,
        ))
        .await
        .unwrap();
    let trail = repo.query_by_order(order.id).await.unwrap();
    assert_eq!(trail, vec![first, second]);
    assert_eq!(trail[1].status_from, StoredStatus::Invalid("new".into()));
    assert!(repo.query_by_order(order.id + 100).await.unwrap().is_empty());
}

pub async fn transition_commits_everything<S: PosStore>(repo: &S) {
    let order = repo.create(new_order("ORD-T")).await.unwrap();
    let delivery = repo
        .create_delivery(NewDelivery::from_draft(
            order.id,
            &delivery_draft(),
            order.delivery_charge,
            now(),
        ))
        .await
        .unwrap();
    let at = now() + Duration::minutes(25);
    let payout = RiderPayout {
        amount: Decimal::from(50),
        slab: PayoutSlab::Over10Km,
        payout_type: PayoutType::PerDelivery,
    };

    let committed = repo
        .commit_transition(TransitionCommit {
            order_id: order.id,
            fields: StatusFields {
                status: OrderStatus::Ready,
                updated_at: at,
                stamp: Some((LifecycleField::ReadyAt, at)),
            },
            delivery: Some(DeliveryChange::AssignRider {
                delivery_id: delivery.id,
                rider_id: 3,
                payout,
            }),
            audit: audit(order.id, OrderStatus::Pending.into(), OrderStatus::Ready),
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(committed.status, OrderStatus::Ready);
    assert_eq!(committed.ready_at, Some(at));

    let stored = repo.get_by_order_id(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DeliveryStatus::Assigned);
    assert_eq!(stored.assigned_rider_id, Some(3));
    assert_eq!(repo.query_by_order(order.id).await.unwrap().len(), 1);
}

pub async fn failed_transition_writes_nothing<S: PosStore>(repo: &S) {
    let order = repo.create(new_order("ORD-F")).await.unwrap();
    let at = now() + Duration::minutes(5);
    let res = repo
        .commit_transition(TransitionCommit {
            order_id: order.id,
            fields: StatusFields {
                status: OrderStatus::Delivered,
                updated_at: at,
                stamp: None,
            },
            delivery: Some(DeliveryChange::Complete {
                delivery_id: 404,
                delivered_at: at,
            }),
            audit: audit(order.id, OrderStatus::Pending.into(), OrderStatus::Delivered),
        })
        .await;
    assert!(res.is_err());
    assert_eq!(repo.get(order.id).await.unwrap().unwrap(), order);
    assert!(repo.query_by_order(order.id).await.unwrap().is_empty());

    let missing = repo
        .commit_transition(TransitionCommit {
            order_id: order.id + 100,
            fields: StatusFields {
                status: OrderStatus::Confirmed,
                updated_at: at,
                stamp: Some((LifecycleField::ConfirmedAt, at)),
            },
            delivery: None,
            audit: audit(order.id + 100, OrderStatus::Pending.into(), OrderStatus::Confirmed),
        })
        .await
        .unwrap();
    assert!(missing.is_none());
    assert!(repo.query_by_order(order.id + 100).await.unwrap().is_empty());
}

/// A delivery order as intake hands it to the store; the ids are filled in
/// by the store.
pub fn intake(number: &str) -> OrderIntake {
    OrderIntake {
        order: new_order(number),
        delivery: Some(NewDelivery::from_draft(0, &delivery_draft(), Decimal::from(200), now())),
        audit: NewAuditRecord {
            notes: Some("order_created".into()),
            ..audit(0, OrderStatus::Pending.into(), OrderStatus::Pending)
        },
    }
}

pub async fn order_bundle_lands_together<S: PosStore>(repo: &S) {
    let (order, delivery) = repo.create_order_bundle(intake("ORD-B")).await.unwrap();
    let delivery = delivery.unwrap();
    assert_eq!(delivery.order_id, order.id);
    assert_eq!(delivery.status, DeliveryStatus::Pending);

    assert_eq!(repo.get(order.id).await.unwrap().unwrap(), order);
    assert_eq!(repo.get_by_order_id(order.id).await.unwrap(), Some(delivery));
    let trail = repo.query_by_order(order.id).await.unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].order_id, order.id);
    assert_eq!(trail[0].notes.as_deref(), Some("order_created"));

    let mut dine_in = intake("ORD-C");
    dine_in.delivery = None;
    let (plain, none) = repo.create_order_bundle(dine_in).await.unwrap();
    assert!(none.is_none());
    assert!(repo.get_by_order_id(plain.id).await.unwrap().is_none());
    assert_eq!(repo.query_by_order(plain.id).await.unwrap().len(), 1);
}
