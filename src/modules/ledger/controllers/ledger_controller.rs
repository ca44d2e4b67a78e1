use std::sync::Arc;

use actix_web::{web, HttpResponse};
use tracing::Instrument;

use crate::core::AppError;
use crate::middleware::RequestIdValue;
use crate::modules::ledger::models::{EditPaymentNoteRequest, RecordPaymentNoteRequest};
use crate::modules::ledger::services::PaymentNoteService;

/// Record a payment note against an invoice
/// POST /invoices/{id}/payment-notes
pub async fn record_payment_note(
    service: web::Data<Arc<PaymentNoteService>>,
    request_id: RequestIdValue,
    path: web::Path<String>,
    request: web::Json<RecordPaymentNoteRequest>,
) -> Result<HttpResponse, AppError> {
    let note = service
        .record_payment_note(&path.into_inner(), request.into_inner())
        .instrument(tracing::info_span!("record_payment_note", request_id = %request_id))
        .await?;

    Ok(HttpResponse::Created().json(note))
}

/// GET /invoices/{id}/payment-notes
pub async fn list_payment_notes(
    service: web::Data<Arc<PaymentNoteService>>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let notes = service.list_payment_notes(&path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(notes))
}

/// PUT /payment-notes/{id}
pub async fn edit_payment_note(
    service: web::Data<Arc<PaymentNoteService>>,
    request_id: RequestIdValue,
    path: web::Path<String>,
    request: web::Json<EditPaymentNoteRequest>,
) -> Result<HttpResponse, AppError> {
    let note = service
        .edit_payment_note(&path.into_inner(), request.into_inner())
        .instrument(tracing::info_span!("edit_payment_note", request_id = %request_id))
        .await?;

    Ok(HttpResponse::Ok().json(note))
}

/// Reconcile the invoice ledger from its current notes
/// GET /invoices/{id}/ledger
pub async fn get_ledger(
    service: web::Data<Arc<PaymentNoteService>>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let ledger = service.invoice_ledger(&path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ledger))
}

/// Configure payment note and ledger routes
pub fn configure_ledger_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/invoices/{id}/payment-notes")
            .route(web::post().to(record_payment_note))
            .route(web::get().to(list_payment_notes)),
    )
    .service(web::resource("/invoices/{id}/ledger").route(web::get().to(get_ledger)))
    .service(web::resource("/payment-notes/{id}").route(web::put().to(edit_payment_note)));
}
