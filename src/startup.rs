//! Service wiring: repositories, services and routes.

use std::sync::Arc;

use actix_web::web;
use sqlx::MySqlPool;

use crate::config::{BillingConfig, StorageBackend};
use crate::core::{KeyedLocks, Result};
use crate::middleware::json_config;
use crate::modules::health::configure_health_routes;
use crate::modules::invoices::controllers::configure_invoice_routes;
use crate::modules::invoices::repositories::{
    InMemoryInvoiceRepository, InvoiceRepository, MySqlInvoiceRepository,
};
use crate::modules::invoices::services::InvoiceService;
use crate::modules::ledger::controllers::configure_ledger_routes;
use crate::modules::ledger::repositories::{
    InMemoryPaymentNoteRepository, MySqlPaymentNoteRepository, PaymentNoteRepository,
};
use crate::modules::ledger::services::PaymentNoteService;
use crate::modules::receipts::controllers::configure_receipt_routes;
use crate::modules::receipts::repositories::{
    InMemoryReceiptRepository, MySqlReceiptRepository, ReceiptRepository,
};
use crate::modules::receipts::services::ReceiptService;
use crate::modules::sequences::controllers::configure_sequence_routes;
use crate::modules::sequences::repositories::{
    CounterStore, InMemoryCounterStore, MySqlCounterStore,
};
use crate::modules::sequences::services::SequenceAllocator;
use crate::modules::taxes::controllers::configure_tax_routes;

/// Shared application state, cloned into every worker
#[derive(Clone)]
pub struct AppState {
    pub backend: StorageBackend,
    pub pool: Option<MySqlPool>,
    pub allocator: Arc<SequenceAllocator>,
    /// Per-invoice guards shared by every service that writes ledger facts
    pub locks: Arc<KeyedLocks>,
    pub invoices: Arc<InvoiceService>,
    pub payment_notes: Arc<PaymentNoteService>,
    pub receipts: Arc<ReceiptService>,
}

/// The four stores the services run on
pub struct Stores {
    pub counters: Arc<dyn CounterStore>,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub payment_notes: Arc<dyn PaymentNoteRepository>,
    pub receipts: Arc<dyn ReceiptRepository>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            counters: Arc::new(InMemoryCounterStore::new()),
            invoices: Arc::new(InMemoryInvoiceRepository::new()),
            payment_notes: Arc::new(InMemoryPaymentNoteRepository::new()),
            receipts: Arc::new(InMemoryReceiptRepository::new()),
        }
    }

    pub fn mysql(pool: &MySqlPool) -> Self {
        Self {
            counters: Arc::new(MySqlCounterStore::new(pool.clone())),
            invoices: Arc::new(MySqlInvoiceRepository::new(pool.clone())),
            payment_notes: Arc::new(MySqlPaymentNoteRepository::new(pool.clone())),
            receipts: Arc::new(MySqlReceiptRepository::new(pool.clone())),
        }
    }
}

impl AppState {
    pub fn from_stores(stores: Stores, billing: BillingConfig, pool: Option<MySqlPool>) -> Self {
        let backend = billing.storage_backend;
        let allocator = Arc::new(SequenceAllocator::new(stores.counters));
        let locks = Arc::new(KeyedLocks::new());

        let invoices = Arc::new(InvoiceService::new(
            stores.invoices.clone(),
            stores.receipts.clone(),
            allocator.clone(),
            locks.clone(),
            billing.clone(),
        ));
        let payment_notes = Arc::new(PaymentNoteService::new(
            stores.payment_notes,
            stores.invoices.clone(),
            stores.receipts.clone(),
            allocator.clone(),
            locks.clone(),
            billing.clone(),
        ));
        let receipts = Arc::new(ReceiptService::new(
            stores.invoices,
            stores.receipts,
            payment_notes.clone(),
            allocator.clone(),
            locks.clone(),
            billing,
        ));

        Self {
            backend,
            pool,
            allocator,
            locks,
            invoices,
            payment_notes,
            receipts,
        }
    }

    /// Single-process state on in-memory stores
    pub fn in_memory(billing: BillingConfig) -> Self {
        let billing = BillingConfig {
            storage_backend: StorageBackend::Memory,
            ..billing
        };
        Self::from_stores(Stores::in_memory(), billing, None)
    }

    /// MySQL-backed state; applies pending migrations first
    pub async fn mysql(pool: MySqlPool, billing: BillingConfig) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        let billing = BillingConfig {
            storage_backend: StorageBackend::MySql,
            ..billing
        };
        Ok(Self::from_stores(Stores::mysql(&pool), billing, Some(pool)))
    }

    /// Register app data and every route
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(json_config())
            .app_data(web::Data::new(self.backend))
            .app_data(web::Data::new(self.allocator.clone()))
            .app_data(web::Data::new(self.invoices.clone()))
            .app_data(web::Data::new(self.payment_notes.clone()))
            .app_data(web::Data::new(self.receipts.clone()));

        if let Some(pool) = &self.pool {
            cfg.app_data(web::Data::new(pool.clone()));
        }

        cfg.configure(configure_health_routes)
            .configure(configure_tax_routes)
            .configure(configure_sequence_routes)
            .configure(configure_invoice_routes)
            .configure(configure_ledger_routes)
            .configure(configure_receipt_routes);
    }
}
