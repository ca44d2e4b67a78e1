use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::Instrument;

use crate::core::AppError;
use crate::middleware::RequestIdValue;
use crate::modules::invoices::models::{CreateInvoiceRequest, ReplaceItemsRequest};
use crate::modules::invoices::services::InvoiceService;
use crate::modules::ledger::services::PaymentNoteService;
use crate::modules::receipts::services::ReceiptService;

/// Query parameters for listing invoices
#[derive(Debug, Deserialize)]
pub struct ListInvoicesQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Create a new invoice
/// POST /invoices
pub async fn create_invoice(
    service: web::Data<Arc<InvoiceService>>,
    request_id: RequestIdValue,
    request: web::Json<CreateInvoiceRequest>,
) -> Result<HttpResponse, AppError> {
    let invoice = service
        .create_invoice(request.into_inner())
        .instrument(tracing::info_span!("create_invoice", request_id = %request_id))
        .await?;

    Ok(HttpResponse::Created().json(invoice))
}

/// Get invoice by ID
/// GET /invoices/{id}
pub async fn get_invoice(
    service: web::Data<Arc<InvoiceService>>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let invoice = service.get_invoice(&path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(invoice))
}

/// List invoices, newest first
/// GET /invoices
pub async fn list_invoices(
    service: web::Data<Arc<InvoiceService>>,
    query: web::Query<ListInvoicesQuery>,
) -> Result<HttpResponse, AppError> {
    let invoices = service.list_invoices(query.limit, query.offset).await?;

    Ok(HttpResponse::Ok().json(invoices))
}

/// Replace line items and recompute totals
/// PUT /invoices/{id}/items
pub async fn replace_items(
    service: web::Data<Arc<InvoiceService>>,
    path: web::Path<String>,
    request: web::Json<ReplaceItemsRequest>,
) -> Result<HttpResponse, AppError> {
    let invoice = service
        .replace_items(&path.into_inner(), request.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(invoice))
}

/// Cancel an invoice
/// POST /invoices/{id}/cancel
pub async fn cancel_invoice(
    service: web::Data<Arc<InvoiceService>>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let invoice = service.cancel_invoice(&path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(invoice))
}

/// Replace fallback numbers with confirmed ones on bills, debit notes and receipts
/// POST /invoices/confirm-numbers
pub async fn confirm_numbers(
    invoices: web::Data<Arc<InvoiceService>>,
    payment_notes: web::Data<Arc<PaymentNoteService>>,
    receipts: web::Data<Arc<ReceiptService>>,
) -> Result<HttpResponse, AppError> {
    let mut confirmed = invoices.confirm_document_numbers().await?;
    confirmed.extend(payment_notes.confirm_note_numbers().await?);
    confirmed.extend(receipts.confirm_receipt_numbers().await?);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "confirmed": confirmed,
    })))
}

/// Configure invoice routes
///
/// Registered as plain resources: the payment note, ledger and receipt
/// modules add their own `/invoices/{id}/...` resources next to these.
pub fn configure_invoice_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/invoices/confirm-numbers").route(web::post().to(confirm_numbers)))
        .service(
            web::resource("/invoices")
                .route(web::post().to(create_invoice))
                .route(web::get().to(list_invoices)),
        )
        .service(web::resource("/invoices/{id}").route(web::get().to(get_invoice)))
        .service(web::resource("/invoices/{id}/items").route(web::put().to(replace_items)))
        .service(web::resource("/invoices/{id}/cancel").route(web::post().to(cancel_invoice)));
}
