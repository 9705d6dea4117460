//! Consistency scan over stored orders, with optional repair.

use crate::application::status_service::{OrderStatusService, TransitionRequest};
use crate::errors::AppError;
use pos_types::domain::audit::{NewAuditRecord, Source, SYSTEM_USER_ID};
use pos_types::domain::order::{Order, OrderId, StatusFields};
use pos_types::domain::status::{normalize_legacy_status, LifecycleField, OrderStatus, StoredStatus};
use pos_types::ports::clock::Clock;
use pos_types::ports::transition::{PosStore, TransitionCommit};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Statuses whose lifecycle stamp must be present while the order sits in them.
const STAMPED_STATUSES: [(OrderStatus, LifecycleField); 3] = [
    (OrderStatus::Cooking, LifecycleField::CookingStartedAt),
    (OrderStatus::Dispatched, LifecycleField::DispatchedAt),
    (OrderStatus::Ready, LifecycleField::ReadyAt),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    MissingTimestamp,
    InvalidStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    pub order_id: OrderId,
    pub issue_type: IssueType,
    pub status: String,
    pub missing_field: Option<LifecycleField>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepairDetail {
    pub order_id: OrderId,
    pub issue_type: IssueType,
    pub action: String,
    pub applied: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepairReport {
    pub dry_run: bool,
    /// Orders scanned.
    pub checked: usize,
    pub fixed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub details: Vec<RepairDetail>,
}

pub fn scan_order(order: &Order) -> Vec<Issue> {
    match &order.status {
        StoredStatus::Valid(status) => STAMPED_STATUSES
            .iter()
            .filter(|(s, field)| s == status && order.lifecycle_timestamp(*field).is_none())
            .map(|(s, field)| Issue {
                order_id: order.id,
                issue_type: IssueType::MissingTimestamp,
                status: s.to_string(),
                missing_field: Some(*field),
            })
            .collect(),
        StoredStatus::Invalid(raw) => vec![Issue {
            order_id: order.id,
            issue_type: IssueType::InvalidStatus,
            status: raw.clone(),
            missing_field: None,
        }],
    }
}

pub struct HealthCheckService<S: PosStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    status: OrderStatusService<S>,
}

impl<S: PosStore> Clone for HealthCheckService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
            status: self.status.clone(),
        }
    }
}

impl<S: PosStore> HealthCheckService<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        let status = OrderStatusService::new(store.clone(), clock.clone());
        Self {
            store,
            clock,
            status,
        }
    }

    pub async fn health_check(&self) -> Result<Vec<Issue>, AppError> {
        let orders = self.store.list().await?;
        Ok(orders.iter().flat_map(scan_order).collect())
    }

    /// Fixes what [`Self::health_check`] finds. With `dry_run` nothing is
    /// written, audit included, and the report lists what would change.
    pub async fn auto_repair(&self, dry_run: bool) -> Result<RepairReport, AppError> {
        let orders = self.store.list().await?;
        let mut report = RepairReport {
            dry_run,
            checked: orders.len(),
            ..Default::default()
        };

        for issue in orders.iter().flat_map(scan_order) {
            let action = match issue.issue_type {
                IssueType::MissingTimestamp => match issue.missing_field {
                    Some(field) => format!("stamp {} for status {}", field, issue.status),
                    None => continue,
                },
                IssueType::InvalidStatus => {
                    let target = normalize_legacy_status(&issue.status);
                    warn!(
                        order_id = issue.order_id,
                        from = %issue.status,
                        to = %target,
                        dry_run,
                        "normalizing legacy order status"
                    );
                    format!("normalize status {:?} to {}", issue.status, target)
                }
            };
            let outcome = if dry_run {
                None
            } else {
                Some(self.repair(&issue).await)
            };

            let (applied, error) = match outcome {
                None | Some(Ok(false)) => {
                    report.skipped += 1;
                    (false, None)
                }
                Some(Ok(true)) => {
                    report.fixed += 1;
                    (true, None)
                }
                Some(Err(e)) => {
                    error!(order_id = issue.order_id, error = %e, "auto-repair failed");
                    report.errors += 1;
                    (false, Some(e.to_string()))
                }
            };
            report.details.push(RepairDetail {
                order_id: issue.order_id,
                issue_type: issue.issue_type,
                action,
                applied,
                error,
            });
        }

        info!(
            dry_run,
            checked = report.checked,
            fixed = report.fixed,
            skipped = report.skipped,
            errors = report.errors,
            "auto-repair finished"
        );
        Ok(report)
    }

    /// Applies one repair against a fresh read of the order. Returns
    /// `false` when the issue no longer holds, so a transition that landed
    /// after the scan is never rolled back.
    async fn repair(&self, issue: &Issue) -> Result<bool, AppError> {
        let order = self.status.load(issue.order_id).await?;
        if !scan_order(&order).contains(issue) {
            debug!(order_id = issue.order_id, "issue resolved since scan");
            return Ok(false);
        }
        if let (StoredStatus::Valid(status), Some(field)) = (&order.status, issue.missing_field) {
            let status = *status;
            self.stamp_missing(order.id, status, field).await?;
            return Ok(true);
        }
        let request = TransitionRequest {
            target: normalize_legacy_status(&issue.status),
            source: Source::System,
            actor_user_id: SYSTEM_USER_ID,
            notes: Some(format!(
                "auto-repair: normalized legacy status {:?}",
                issue.status
            )),
            force: true,
            delivery: None,
        };
        self.status.execute(order, request).await?;
        Ok(true)
    }

    /// Stamps the field and records a system self-transition so the audit
    /// trail shows the repair.
    async fn stamp_missing(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        field: LifecycleField,
    ) -> Result<(), AppError> {
        let now = self.clock.now();
        let commit = TransitionCommit {
            order_id,
            fields: StatusFields {
                status,
                updated_at: now,
                stamp: Some((field, now)),
            },
            delivery: None,
            audit: NewAuditRecord {
                order_id,
                status_from: status.into(),
                status_to: status,
                source: Source::System,
                actor_user_id: SYSTEM_USER_ID,
                notes: Some(format!("auto-repair: set missing {}", field)),
                created_at: now,
            },
        };
        match self.store.commit_transition(commit).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("order {}", order_id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::status_service::TransitionOptions;
    use chrono::{TimeZone, Utc};
    use pos_repo::memory::InMemoryRepo;
    use pos_types::domain::order::{ItemDraft, NewOrder, OrderDraft, OrderType};
    use pos_types::ports::audit_log::AuditLog;
    use pos_types::ports::clock::ManualClock;
    use pos_types::ports::order_store::OrderStore;
    use rust_decimal::Decimal;

    fn new_order(status: StoredStatus) -> NewOrder {
        let draft = OrderDraft {
            order_type: OrderType::Takeaway,
            items: vec![ItemDraft {
                product_name: "Samosa".into(),
                quantity: 4,
                unit_price: Decimal::from(60),
                cost_price: None,
            }],
            delivery_charge: Decimal::ZERO,
            discount: Decimal::ZERO,
            tax: Decimal::ZERO,
            payment_status: Default::default(),
            payment_type: Default::default(),
            cashier_id: None,
            cooking_eta_minutes: None,
            delivery_eta_minutes: None,
            delivery: None,
        };
        let mut order = NewOrder::from_draft(&draft, "ORD-H".into(), Utc::now()).unwrap();
        order.status = status;
        order
    }

    fn order_with(status: StoredStatus) -> Order {
        new_order(status).into_order(11)
    }

    #[test]
    fn scan_flags_missing_stamps() {
        let order = order_with(OrderStatus::Dispatched.into());
        let issues = scan_order(&order);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::MissingTimestamp);
        assert_eq!(issues[0].missing_field, Some(LifecycleField::DispatchedAt));
        assert_eq!(issues[0].status, "dispatched");
    }

    #[test]
    fn scan_ignores_statuses_without_required_stamp() {
        for status in [OrderStatus::Pending, OrderStatus::Delivered, OrderStatus::Cancelled] {
            assert!(scan_order(&order_with(status.into())).is_empty());
        }
        let mut cooking = order_with(OrderStatus::Cooking.into());
        cooking.cooking_started_at = Some(Utc::now());
        assert!(scan_order(&cooking).is_empty());
    }

    #[test]
    fn scan_flags_invalid_status() {
        let issues = scan_order(&order_with(StoredStatus::Invalid("preparing".into())));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::InvalidStatus);
        assert_eq!(issues[0].status, "preparing");
        assert_eq!(issues[0].missing_field, None);
    }
    #[tokio::test]
    async fn repair_leaves_orders_that_moved_after_the_scan() {
        let repo = Arc::new(InMemoryRepo::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 7, 1, 18, 0, 0).unwrap(),
        ));
        let id = repo
            .create(new_order(OrderStatus::Dispatched.into()))
            .await
            .unwrap()
            .id;
        let svc = HealthCheckService::new(repo.clone(), clock);
        let issues = svc.health_check().await.unwrap();
        assert_eq!(issues.len(), 1);

        // The rider completes the order between scan and repair.
        svc.status
            .transition_status(
                id,
                OrderStatus::Delivered,
                Source::Rider,
                5,
                TransitionOptions::default(),
            )
            .await
            .unwrap();

        assert!(!svc.repair(&issues[0]).await.unwrap());
        let order = repo.get(id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.dispatched_at, None);
        assert_eq!(repo.query_by_order(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stale_legacy_issue_is_not_reapplied() {
        let repo = Arc::new(InMemoryRepo::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 7, 1, 18, 0, 0).unwrap(),
        ));
        let id = repo
            .create(new_order(StoredStatus::Invalid("preparing".into())))
            .await
            .unwrap()
            .id;
        let svc = HealthCheckService::new(repo.clone(), clock);
        let issues = svc.health_check().await.unwrap();

        svc.status
            .transition_status(
                id,
                OrderStatus::Ready,
                Source::Kds,
                2,
                TransitionOptions::default(),
            )
            .await
            .unwrap();

        assert!(!svc.repair(&issues[0]).await.unwrap());
        assert_eq!(
            repo.get(id).await.unwrap().unwrap().status,
            OrderStatus::Ready
        );
    }
}
