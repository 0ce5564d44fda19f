//! Invoice routes.

use super::{AppState, auth::CurrentUser};
use crate::{
    core::{
        invoices::{self, InvoiceQuery, NewInvoice},
        print, today,
    },
    entities::{Invoice, Record},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/invoices", get(list).post(create))
        .route("/api/invoices/overdue", post(mark_overdue))
        .route("/api/invoices/:id", get(show))
        .route("/api/invoices/:id/paid", post(mark_paid))
        .route("/api/invoices/:id/print", get(print_invoice))
}

type InvoiceResponse = Result<Json<Record<Invoice>>>;

async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<InvoiceQuery>,
) -> Result<Json<Vec<Record<Invoice>>>> {
    Ok(Json(invoices::list_invoices(&state.records, &current.actor, &query).await?))
}

async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(new): Json<NewInvoice>,
) -> Result<(StatusCode, Json<Record<Invoice>>)> {
    let invoice = invoices::create_invoice(&state.records, &current.actor, new).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

async fn show(State(state): State<AppState>, current: CurrentUser, Path(id): Path<String>) -> InvoiceResponse {
    Ok(Json(invoices::get_invoice(&state.records, &current.actor, &id).await?))
}

async fn mark_paid(State(state): State<AppState>, current: CurrentUser, Path(id): Path<String>) -> InvoiceResponse {
    Ok(Json(invoices::mark_paid(&state.records, &current.actor, &id).await?))
}

/// Flags every unpaid invoice past its due date and returns the changed ones.
async fn mark_overdue(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<Record<Invoice>>>> {
    Ok(Json(
        invoices::mark_overdue(&state.records, &current.actor, today()).await?,
    ))
}

async fn print_invoice(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Html<String>> {
    Ok(Html(print::invoice_document(&state.records, &current.actor, &id).await?))
}
