use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pos_types::domain::audit::{NewAuditRecord, Source, StatusAuditRecord};
use pos_types::domain::delivery::{
    Delivery, DeliveryChange, DeliveryId, DeliveryStatus, NewDelivery,
};
use pos_types::domain::order::{
    NewOrder, Order, OrderId, OrderItem, OrderType, PaymentStatus, PaymentType, StatusFields,
};
use pos_types::domain::rider::{PayoutSlab, PayoutType, Rider, RiderId, RiderPayout, RiderStatus};
use pos_types::domain::status::{OrderStatus, StoredStatus};
use pos_types::ports::audit_log::AuditLog;
use pos_types::ports::delivery_store::DeliveryStore;
use pos_types::ports::order_store::{OrderStore, RepoError};
use pos_types::ports::rider_directory::RiderDirectory;
use pos_types::ports::transition::{OrderIntake, TransitionCommit, TransitionWriter};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::str::FromStr;

pub struct SqliteRepo {
    pool: SqlitePool,
}

const ORDER_COLUMNS: &str = "id, order_number, tracking_token, order_type, subtotal, delivery_charge, \
     discount, tax, grand_total, payment_status, payment_type, order_status, confirmed_at, \
     cooking_started_at, ready_at, dispatched_at, cooking_eta_minutes, delivery_eta_minutes, \
     cashier_id, items_json, created_at, updated_at";

const DELIVERY_COLUMNS: &str = "id, order_id, customer_name, customer_phone, address, location_name, \
     distance_km, delivery_charge, is_free_delivery, special_instructions, assigned_rider_id, \
     delivery_status, rider_pay_amount, rider_pay_slab, rider_pay_type, delivered_at, created_at";

fn db_err(e: sqlx::Error) -> RepoError {
    match e.as_database_error() {
        Some(d) if d.is_unique_violation() => RepoError::Conflict(d.message().to_string()),
        _ => RepoError::DbError(e.to_string()),
    }
}

fn corrupt(e: impl std::fmt::Display) -> RepoError {
    RepoError::Corrupt(e.to_string())
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, RepoError> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(corrupt)?
        .with_timezone(&Utc))
}

fn parse_opt_time(raw: Option<String>) -> Result<Option<DateTime<Utc>>, RepoError> {
    raw.as_deref().map(parse_time).transpose()
}

fn parse_decimal(raw: &str) -> Result<Decimal, RepoError> {
    Decimal::from_str(raw).map_err(corrupt)
}

fn parse_enum<T>(raw: &str, parse: impl Fn(&str) -> Option<T>, what: &str) -> Result<T, RepoError> {
    parse(raw).ok_or_else(|| RepoError::Corrupt(format!("unknown {what}: {raw}")))
}

#[derive(FromRow)]
struct DbOrder {
    id: i64,
    order_number: String,
    tracking_token: Option<String>,
    order_type: String,
    subtotal: String,
    delivery_charge: String,
    discount: String,
    tax: String,
    grand_total: String,
    payment_status: String,
    payment_type: String,
    order_status: String,
    confirmed_at: Option<String>,
    cooking_started_at: Option<String>,
    ready_at: Option<String>,
    dispatched_at: Option<String>,
    cooking_eta_minutes: i64,
    delivery_eta_minutes: i64,
    cashier_id: Option<i64>,
    items_json: String,
    created_at: String,
    updated_at: String,
}

impl DbOrder {
    fn into_order(self) -> Result<Order, RepoError> {
        let items: Vec<OrderItem> = serde_json::from_str(&self.items_json).map_err(corrupt)?;
        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            tracking_token: self.tracking_token,
            order_type: parse_enum(&self.order_type, OrderType::parse, "order type")?,
            subtotal: parse_decimal(&self.subtotal)?,
            delivery_charge: parse_decimal(&self.delivery_charge)?,
            discount: parse_decimal(&self.discount)?,
            tax: parse_decimal(&self.tax)?,
            grand_total: parse_decimal(&self.grand_total)?,
            payment_status: parse_enum(
                &self.payment_status,
                PaymentStatus::parse,
                "payment status",
            )?,
            payment_type: parse_enum(&self.payment_type, PaymentType::parse, "payment type")?,
            // Legacy strings are kept verbatim for the health check to find.
            status: StoredStatus::parse(&self.order_status),
            confirmed_at: parse_opt_time(self.confirmed_at)?,
            cooking_started_at: parse_opt_time(self.cooking_started_at)?,
            ready_at: parse_opt_time(self.ready_at)?,
            dispatched_at: parse_opt_time(self.dispatched_at)?,
            cooking_eta_minutes: u32::try_from(self.cooking_eta_minutes).map_err(corrupt)?,
            delivery_eta_minutes: u32::try_from(self.delivery_eta_minutes).map_err(corrupt)?,
            cashier_id: self.cashier_id,
            items,
            created_at: parse_time(&self.created_at)?,
            updated_at: parse_time(&self.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbDelivery {
    id: i64,
    order_id: i64,
    customer_name: String,
    customer_phone: String,
    address: String,
    location_name: String,
    distance_km: String,
    delivery_charge: String,
    is_free_delivery: bool,
    special_instructions: Option<String>,
    assigned_rider_id: Option<i64>,
    delivery_status: String,
    rider_pay_amount: Option<String>,
    rider_pay_slab: Option<String>,
    rider_pay_type: Option<String>,
    delivered_at: Option<String>,
    created_at: String,
}

impl DbDelivery {
    fn into_delivery(self) -> Result<Delivery, RepoError> {
        Ok(Delivery {
            id: self.id,
            order_id: self.order_id,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            address: self.address,
            location_name: self.location_name,
            distance_km: parse_decimal(&self.distance_km)?,
            delivery_charge: parse_decimal(&self.delivery_charge)?,
            is_free_delivery: self.is_free_delivery,
            special_instructions: self.special_instructions,
            assigned_rider_id: self.assigned_rider_id,
            status: parse_enum(&self.delivery_status, DeliveryStatus::parse, "delivery status")?,
            rider_pay_amount: self.rider_pay_amount.as_deref().map(parse_decimal).transpose()?,
            rider_pay_slab: self
                .rider_pay_slab
                .as_deref()
                .map(|s| parse_enum(s, PayoutSlab::parse, "payout slab"))
                .transpose()?,
            rider_pay_type: self
                .rider_pay_type
                .as_deref()
                .map(|s| parse_enum(s, PayoutType::parse, "payout type"))
                .transpose()?,
            delivered_at: parse_opt_time(self.delivered_at)?,
            created_at: parse_time(&self.created_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbRider {
    id: i64,
    name: String,
    phone: String,
    vehicle_number: Option<String>,
    status: String,
    payout_type: String,
    per_delivery_rate: String,
    per_km_rate: String,
    base_rate: String,
}

impl DbRider {
    fn into_rider(self) -> Result<Rider, RepoError> {
        let status = match self.status.as_str() {
            "active" => RiderStatus::Active,
            "inactive" => RiderStatus::Inactive,
            other => return Err(RepoError::Corrupt(format!("unknown rider status: {other}"))),
        };
        Ok(Rider {
            id: self.id,
            name: self.name,
            phone: self.phone,
            vehicle_number: self.vehicle_number,
            status,
            payout_type: parse_enum(&self.payout_type, PayoutType::parse, "payout type")?,
            per_delivery_rate: parse_decimal(&self.per_delivery_rate)?,
            per_km_rate: parse_decimal(&self.per_km_rate)?,
            base_rate: parse_decimal(&self.base_rate)?,
        })
    }
}

#[derive(FromRow)]
struct DbAuditRecord {
    id: i64,
    order_id: i64,
    status_from: String,
    status_to: String,
    source: String,
    actor_user_id: i64,
    notes: Option<String>,
    created_at: String,
}

impl DbAuditRecord {
    fn into_record(self) -> Result<StatusAuditRecord, RepoError> {
        Ok(StatusAuditRecord {
            id: self.id,
            order_id: self.order_id,
            status_from: StoredStatus::parse(&self.status_from),
            status_to: OrderStatus::from_str(&self.status_to).map_err(corrupt)?,
            source: Source::from_str(&self.source).map_err(corrupt)?,
            actor_user_id: self.actor_user_id,
            notes: self.notes,
            created_at: parse_time(&self.created_at)?,
        })
    }
}

async fn insert_order(conn: &mut SqliteConnection, order: &NewOrder) -> Result<i64, RepoError> {
    let items_json = serde_json::to_string(&order.items).map_err(corrupt)?;
    let res = sqlx::query(
        "INSERT INTO orders (order_number, order_type, subtotal, delivery_charge, discount, tax,
             grand_total, payment_status, payment_type, order_status, cooking_eta_minutes,
             delivery_eta_minutes, cashier_id, items_json, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&order.order_number)
    .bind(order.order_type.as_str())
    .bind(order.subtotal.to_string())
    .bind(order.delivery_charge.to_string())
    .bind(order.discount.to_string())
    .bind(order.tax.to_string())
    .bind(order.grand_total.to_string())
    .bind(order.payment_status.as_str())
    .bind(order.payment_type.as_str())
    .bind(order.status.as_str())
    .bind(order.cooking_eta_minutes)
    .bind(order.delivery_eta_minutes)
    .bind(order.cashier_id)
    .bind(items_json)
    .bind(order.created_at.to_rfc3339())
    .bind(order.created_at.to_rfc3339())
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;
    Ok(res.last_insert_rowid())
}

async fn insert_delivery(
    conn: &mut SqliteConnection,
    delivery: &NewDelivery,
) -> Result<i64, RepoError> {
    let res = sqlx::query(
        "INSERT INTO deliveries (order_id, customer_name, customer_phone, address, location_name,
             distance_km, delivery_charge, is_free_delivery, special_instructions, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(delivery.order_id)
    .bind(&delivery.customer_name)
    .bind(&delivery.customer_phone)
    .bind(&delivery.address)
    .bind(&delivery.location_name)
    .bind(delivery.distance_km.to_string())
    .bind(delivery.delivery_charge.to_string())
    .bind(delivery.is_free_delivery)
    .bind(&delivery.special_instructions)
    .bind(delivery.created_at.to_rfc3339())
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;
    Ok(res.last_insert_rowid())
}

async fn write_status_fields(
    conn: &mut SqliteConnection,
    id: OrderId,
    fields: &StatusFields,
) -> Result<bool, RepoError> {
    let sql = match fields.stamp {
        Some((field, _)) => format!(
            "UPDATE orders SET order_status = ?, updated_at = ?, {} = ? WHERE id = ?",
            field.column()
        ),
        None => "UPDATE orders SET order_status = ?, updated_at = ? WHERE id = ?".to_string(),
    };
    let mut query = sqlx::query(&sql)
        .bind(fields.status.as_str())
        .bind(fields.updated_at.to_rfc3339());
    if let Some((_, at)) = fields.stamp {
        query = query.bind(at.to_rfc3339());
    }
    let res = query.bind(id).execute(&mut *conn).await.map_err(db_err)?;
    Ok(res.rows_affected() > 0)
}

async fn write_delivery_change(
    conn: &mut SqliteConnection,
    change: &DeliveryChange,
) -> Result<bool, RepoError> {
    let res = match change {
        DeliveryChange::AssignRider {
            delivery_id,
            rider_id,
            payout,
        } => sqlx::query(
            "UPDATE deliveries SET assigned_rider_id = ?, delivery_status = ?, rider_pay_amount = ?,
                 rider_pay_slab = ?, rider_pay_type = ? WHERE id = ?",
        )
        .bind(rider_id)
        .bind(DeliveryStatus::Assigned.as_str())
        .bind(payout.amount.to_string())
        .bind(payout.slab.as_str())
        .bind(payout.payout_type.as_str())
        .bind(delivery_id)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?,
        DeliveryChange::Complete {
            delivery_id,
            delivered_at,
        } => sqlx::query("UPDATE deliveries SET delivery_status = ?, delivered_at = ? WHERE id = ?")
            .bind(DeliveryStatus::Delivered.as_str())
            .bind(delivered_at.to_rfc3339())
            .bind(delivery_id)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?,
    };
    Ok(res.rows_affected() > 0)
}

async fn insert_audit(
    conn: &mut SqliteConnection,
    record: NewAuditRecord,
) -> Result<StatusAuditRecord, RepoError> {
    let res = sqlx::query(
        "INSERT INTO order_status_log (order_id, status_from, status_to, source, actor_user_id,
             notes, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(record.order_id)
    .bind(record.status_from.as_str())
    .bind(record.status_to.as_str())
    .bind(record.source.as_str())
    .bind(record.actor_user_id)
    .bind(&record.notes)
    .bind(record.created_at.to_rfc3339())
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;
    Ok(record.into_record(res.last_insert_rowid()))
}

impl SqliteRepo {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options).await?;

        let ddl = include_str!("../migrations/0001_create_pos.sql");
        for stmt in ddl.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(stmt).execute(&pool).await?;
        }

        Ok(Self { pool })
    }

    async fn fetch_order(
        &self,
        clause: &str,
        bind: impl ToString,
    ) -> Result<Option<Order>, RepoError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE {clause}");
        let row: Option<DbOrder> = sqlx::query_as(&sql)
            .bind(bind.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(DbOrder::into_order).transpose()
    }
}

#[async_trait]
impl OrderStore for SqliteRepo {
    async fn create(&self, order: NewOrder) -> Result<Order, RepoError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        let id = insert_order(&mut conn, &order).await?;
        Ok(order.into_order(id))
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepoError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?");
        let row: Option<DbOrder> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(DbOrder::into_order).transpose()
    }

    async fn get_by_tracking_token(&self, token: &str) -> Result<Option<Order>, RepoError> {
        self.fetch_order("tracking_token = ?", token).await
    }

    async fn list(&self) -> Result<Vec<Order>, RepoError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY id");
        let rows: Vec<DbOrder> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.into_iter()
            .map(|r| r.into_order())
            .collect::<Result<Vec<_>, _>>()
    }

    async fn update_status_fields(
        &self,
        id: OrderId,
        fields: &StatusFields,
    ) -> Result<Option<Order>, RepoError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        if !write_status_fields(&mut conn, id, fields).await? {
            return Ok(None);
        }
        self.get(id).await
    }

    async fn set_tracking_token(&self, id: OrderId, token: &str) -> Result<bool, RepoError> {
        let res = sqlx::query("UPDATE orders SET tracking_token = ? WHERE id = ?")
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl DeliveryStore for SqliteRepo {
    async fn create_delivery(&self, delivery: NewDelivery) -> Result<Delivery, RepoError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        let id = insert_delivery(&mut conn, &delivery).await?;
        Ok(delivery.into_delivery(id))
    }

    async fn get_by_order_id(&self, order_id: OrderId) -> Result<Option<Delivery>, RepoError> {
        let sql = format!("SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE order_id = ?");
        let row: Option<DbDelivery> = sqlx::query_as(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(DbDelivery::into_delivery).transpose()
    }

    async fn update_rider_assignment(
        &self,
        delivery_id: DeliveryId,
        rider_id: RiderId,
        payout: &RiderPayout,
    ) -> Result<bool, RepoError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        let change = DeliveryChange::AssignRider {
            delivery_id,
            rider_id,
            payout: *payout,
        };
        write_delivery_change(&mut conn, &change).await
    }

    async fn update_delivery_status(
        &self,
        delivery_id: DeliveryId,
        status: DeliveryStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> Result<bool, RepoError> {
        let res = sqlx::query(
            "UPDATE deliveries SET delivery_status = ?, delivered_at = COALESCE(?, delivered_at)
             WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(delivered_at.map(|t| t.to_rfc3339()))
        .bind(delivery_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl AuditLog for SqliteRepo {
    async fn append(&self, record: NewAuditRecord) -> Result<StatusAuditRecord, RepoError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        insert_audit(&mut conn, record).await
    }

    async fn query_by_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<StatusAuditRecord>, RepoError> {
        let rows: Vec<DbAuditRecord> = sqlx::query_as(
            "SELECT id, order_id, status_from, status_to, source, actor_user_id, notes, created_at
             FROM order_status_log WHERE order_id = ? ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(DbAuditRecord::into_record).collect()
    }
}

#[async_trait]
impl RiderDirectory for SqliteRepo {
    async fn get_rider(&self, id: RiderId) -> Result<Option<Rider>, RepoError> {
        let row: Option<DbRider> = sqlx::query_as(
            "SELECT id, name, phone, vehicle_number, status, payout_type, per_delivery_rate,
                 per_km_rate, base_rate FROM riders WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(DbRider::into_rider).transpose()
    }

    async fn save_rider(&self, rider: Rider) -> Result<Rider, RepoError> {
        let status = match rider.status {
            RiderStatus::Active => "active",
            RiderStatus::Inactive => "inactive",
        };
        sqlx::query(
            "INSERT OR REPLACE INTO riders (id, name, phone, vehicle_number, status, payout_type,
                 per_delivery_rate, per_km_rate, base_rate)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(rider.id)
        .bind(&rider.name)
        .bind(&rider.phone)
        .bind(&rider.vehicle_number)
        .bind(status)
        .bind(rider.payout_type.as_str())
        .bind(rider.per_delivery_rate.to_string())
        .bind(rider.per_km_rate.to_string())
        .bind(rider.base_rate.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rider)
    }
}

#[async_trait]
impl TransitionWriter for SqliteRepo {
    async fn commit_transition(
        &self,
        commit: TransitionCommit,
    ) -> Result<Option<Order>, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        if !write_status_fields(&mut tx, commit.order_id, &commit.fields).await? {
            tx.rollback().await.map_err(db_err)?;
            return Ok(None);
        }
        if let Some(change) = &commit.delivery {
            if !write_delivery_change(&mut tx, change).await? {
                tx.rollback().await.map_err(db_err)?;
                return Err(RepoError::DbError(format!(
                    "delivery {} not found",
                    change.delivery_id()
                )));
            }
        }
        insert_audit(&mut tx, commit.audit).await?;
        tx.commit().await.map_err(db_err)?;

        self.get(commit.order_id).await
    }
    async fn create_order_bundle(
        &self,
        intake: OrderIntake,
    ) -> Result<(Order, Option<Delivery>), RepoError> {
        // Dropping `tx` on an early return rolls the whole bundle back.
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let id = insert_order(&mut tx, &intake.order).await?;
        let delivery = match intake.delivery {
            Some(mut new) => {
                new.order_id = id;
                let delivery_id = insert_delivery(&mut tx, &new).await?;
                Some(new.into_delivery(delivery_id))
            }
            None => None,
        };
        let mut audit = intake.audit;
        audit.order_id = id;
        insert_audit(&mut tx, audit).await?;
        tx.commit().await.map_err(db_err)?;

        Ok((intake.order.into_order(id), delivery))
    }
}
