use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::core::AppError;
use crate::modules::sequences::models::{DocumentNumber, DocumentType};
use crate::modules::sequences::services::SequenceAllocator;

#[derive(Debug, Deserialize)]
pub struct SeedSequenceRequest {
    /// Latest legacy document number, e.g. "WNF-41"
    pub last_issued: String,
}

/// Allocate the next document number
/// POST /sequences/{prefix}/{document_type}/next
pub async fn allocate_next(
    allocator: web::Data<Arc<SequenceAllocator>>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (prefix, document_type) = path.into_inner();
    let document_type: DocumentType = document_type.parse()?;

    let number = allocator.allocate_next_number(&prefix, document_type).await?;

    Ok(HttpResponse::Ok().json(number))
}

/// Seed a sequence from the latest legacy document number
/// POST /sequences/{prefix}/{document_type}/seed
pub async fn seed_sequence(
    allocator: web::Data<Arc<SequenceAllocator>>,
    path: web::Path<(String, String)>,
    request: web::Json<SeedSequenceRequest>,
) -> Result<HttpResponse, AppError> {
    let (prefix, document_type) = path.into_inner();
    let document_type: DocumentType = document_type.parse()?;

    let (parsed_prefix, _) = DocumentNumber::parse(&request.last_issued)?;
    if !parsed_prefix.eq_ignore_ascii_case(prefix.trim()) {
        return Err(AppError::validation(format!(
            "Document number '{}' does not belong to prefix '{}'",
            request.last_issued, prefix
        )));
    }

    let last_issued = allocator
        .seed_from_document_number(document_type, &request.last_issued)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "company_prefix": prefix.trim().to_uppercase(),
        "document_type": document_type,
        "last_issued": last_issued,
    })))
}

/// List numbers issued while the counter store was unreachable
/// GET /sequences/unconfirmed
pub async fn list_unconfirmed(allocator: web::Data<Arc<SequenceAllocator>>) -> HttpResponse {
    HttpResponse::Ok().json(allocator.unconfirmed_numbers())
}

/// Configure sequence routes
pub fn configure_sequence_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/sequences")
            .route("/unconfirmed", web::get().to(list_unconfirmed))
            .route("/{prefix}/{document_type}/next", web::post().to(allocate_next))
            .route("/{prefix}/{document_type}/seed", web::post().to(seed_sequence)),
    );
}
