///  To run :
///  cargo r --example client_example
use pos_client::{CreateOrderRequest, DispatchEventRequest, PosClient};
use pos_hex::application::PosServices;
use pos_hex::config::Config;
use pos_hex::inbound::http::{HttpServer, HttpServerConfig};
use pos_repo::build_repo;
use pos_types::domain::audit::Source;
use pos_types::domain::delivery::DeliveryDraft;
use pos_types::domain::event::OrderEvent;
use pos_types::domain::order::{ItemDraft, OrderDraft, OrderType};
use pos_types::domain::rider::{PayoutType, Rider, RiderStatus};
use pos_types::ports::clock::SystemClock;
use pos_types::ports::random::OsRandom;
use pos_types::ports::rider_directory::RiderDirectory;
use rust_decimal::Decimal;
use std::sync::Arc;
use tempfile::tempdir;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port = find_free_port();
    let addr = format!("http://127.0.0.1:{port}/");

    // Use a temp file-backed SQLite DB so multiple connections see the same data.
    let tmp = tempdir()?;
    let db_path = tmp.path().join("pos.db");
    let db_url = format!("sqlite://{}", db_path.display());

    let repo = Arc::new(build_repo(Some(&db_url)).await?);
    repo.save_rider(Rider {
        id: 1,
        name: "Faisal".into(),
        phone: "0300-5556677".into(),
        vehicle_number: Some("LEA-1020".into()),
        status: RiderStatus::Active,
        payout_type: PayoutType::Hybrid,
        per_delivery_rate: Decimal::from(30),
        per_km_rate: Decimal::from(5),
        base_rate: Decimal::from(20),
    })
    .await?;

    let services = PosServices::new(
        repo,
        Arc::new(SystemClock),
        Arc::new(OsRandom),
        &Config::default(),
    );
    let server = HttpServer::new(
        services,
        HttpServerConfig {
            port: port.to_string(),
        },
    )
    .await?;

    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let client = PosClient::new(&addr)?;
    let created = client
        .create_order(CreateOrderRequest {
            source: Source::Pos,
            actor_user_id: 1,
            draft: OrderDraft {
                order_type: OrderType::Delivery,
                items: vec![ItemDraft {
                    product_name: "Beef Pulao".into(),
                    quantity: 2,
                    unit_price: Decimal::from(650),
                    cost_price: None,
                }],
                delivery_charge: Decimal::from(100),
                discount: Decimal::ZERO,
                tax: Decimal::ZERO,
                payment_status: Default::default(),
                payment_type: Default::default(),
                cashier_id: Some(1),
                cooking_eta_minutes: None,
                delivery_eta_minutes: None,
                delivery: Some(DeliveryDraft {
                    customer_name: "Nadia".into(),
                    customer_phone: "0333-1212121".into(),
                    address: "14 Garden Town".into(),
                    location_name: "Garden Town".into(),
                    distance_km: Decimal::new(55, 1),
                    is_free_delivery: false,
                    special_instructions: None,
                }),
            },
        })
        .await?;
    let id = created.order.id;
    println!("Created order {} ({})", id, created.order.order_number);

    for event in [
        OrderEvent::OrderConfirmed,
        OrderEvent::CookingStarted,
        OrderEvent::KitchenCompleted,
    ] {
        let res = client
            .dispatch_event(id, DispatchEventRequest::new(event, Source::Kds, 2))
            .await?;
        println!("{:?} -> {:?}", event, res.change.new_status);
    }

    let assigned = client
        .dispatch_event(
            id,
            DispatchEventRequest::new(OrderEvent::RiderAssigned, Source::Pos, 1).rider(1),
        )
        .await?;
    if let Some(payout) = assigned.payout {
        println!("Rider payout {} ({})", payout.amount, payout.slab.as_str());
    }

    let token = client.tracking_token(id).await?;
    let view = client.track(&token.token).await?;
    println!(
        "Tracking {}: status={:?} rider={:?}",
        token.token,
        view.status,
        view.rider.map(|r| r.name)
    );

    let history = client.order_history(id).await?;
    println!("Audit trail has {} entries", history.len());

    handle.abort();
    Ok(())
}
