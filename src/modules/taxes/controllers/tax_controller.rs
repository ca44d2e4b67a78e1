//! Tax controller for HTTP endpoints
//!
//! Lets the billing form preview a line's GST split before the invoice is saved.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::core::AppError;
use crate::modules::invoices::models::LineItem;
use crate::modules::taxes::models::TaxRegime;
use crate::modules::taxes::services::TaxSplitter;

#[derive(Debug, Deserialize)]
pub struct ComputeLineItemRequest {
    pub item: LineItem,
    #[serde(default)]
    pub is_other_state: bool,
}

/// Compute the tax split for a single line
///
/// POST /taxes/line-items/compute
pub async fn compute_line_item(
    request: web::Json<ComputeLineItemRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    let regime = TaxRegime::from_other_state(request.is_other_state);

    let computed = TaxSplitter::new().compute_line_item(&request.item, regime)?;

    Ok(HttpResponse::Ok().json(computed))
}

/// Configure tax routes
pub fn configure_tax_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/taxes").route("/line-items/compute", web::post().to(compute_line_item)),
    );
}
