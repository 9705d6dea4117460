//! pos-types: domain model and storage ports for the order lifecycle core.

pub mod domain {
    pub mod audit;
    pub mod delivery;
    pub mod event;
    pub mod order;
    pub mod payout;
    pub mod rider;
    pub mod status;
    pub mod tracking;
}

pub mod ports {
    pub mod audit_log;
    pub mod clock;
    pub mod delivery_store;
    pub mod order_store;
    pub mod random;
    pub mod rider_directory;
    pub mod transition;
}
