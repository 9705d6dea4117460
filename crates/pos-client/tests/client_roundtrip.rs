use pos_client::{CreateOrderRequest, DispatchEventRequest, PosClient, UpdateStatusRequest};
use pos_hex::application::PosServices;
use pos_hex::config::Config;
use pos_hex::inbound::http::{HttpServer, HttpServerConfig};
use pos_repo::memory::InMemoryRepo;
use pos_types::domain::audit::Source;
use pos_types::domain::event::OrderEvent;
use pos_types::domain::order::{ItemDraft, OrderDraft, OrderType};
use pos_types::domain::status::OrderStatus;
use rust_decimal::Decimal;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::test]
async fn client_drives_a_live_server() {
    let port = find_free_port();
    let services = PosServices::with_system_defaults(InMemoryRepo::new(), &Config::default());
    let server = HttpServer::new(
        services,
        HttpServerConfig {
            port: port.to_string(),
        },
    )
    .await
    .unwrap();
    tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let client = PosClient::new(&format!("http://127.0.0.1:{}/", port)).unwrap();
    let created = client
        .create_order(CreateOrderRequest {
            source: Source::Pos,
            actor_user_id: 2,
            draft: OrderDraft {
                order_type: OrderType::DineIn,
                items: vec![ItemDraft {
                    product_name: "Haleem".into(),
                    quantity: 2,
                    unit_price: Decimal::from(450),
                    cost_price: None,
                }],
                delivery_charge: Decimal::ZERO,
                discount: Decimal::ZERO,
                tax: Decimal::ZERO,
                payment_status: Default::default(),
                payment_type: Default::default(),
                cashier_id: Some(2),
                cooking_eta_minutes: Some(25),
                delivery_eta_minutes: None,
                delivery: None,
            },
        })
        .await
        .unwrap();
    let id = created.order.id;
    assert_eq!(created.order.grand_total, Decimal::from(900));

    let change = client
        .update_status(id, UpdateStatusRequest::new(OrderStatus::Confirmed, Source::Pos, 2))
        .await
        .unwrap();
    assert!(change.changed);

    let event = client
        .dispatch_event(id, DispatchEventRequest::new(OrderEvent::CookingStarted, Source::Kds, 8))
        .await
        .unwrap();
    assert_eq!(event.change.new_status, OrderStatus::Cooking);

    let token = client.tracking_token(id).await.unwrap();
    assert_eq!(client.tracking_token(id).await.unwrap(), token);
    let view = client.track(&token.token).await.unwrap();
    assert_eq!(view.status, OrderStatus::Cooking);
    assert_eq!(view.cooking_eta_minutes, 25);

    assert_eq!(client.order_history(id).await.unwrap().len(), 3);
    assert_eq!(client.list_orders().await.unwrap().len(), 1);
    assert!(client.health_check().await.unwrap().is_empty());
    assert_eq!(client.auto_repair(true).await.unwrap().checked, 1);
    assert!(client.get_order(id + 1).await.is_err());
}
