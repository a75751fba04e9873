// HTTP request handlers for API endpoints

use actix_web::{web, HttpResponse, Result};

use crate::api::models::*;
use crate::api::server::AppState;
use crate::error::CatalogError;
use crate::models::{SearchPage, SearchQuery, Store};
use crate::relevance;

const MAX_PAGE_SIZE: u32 = 50;

/// Health check endpoint. Reports the configured stores without touching
/// any upstream.
pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    let response = ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        stores: state
            .catalogs
            .iter()
            .map(|c| c.store().slug().to_string())
            .collect(),
    });

    Ok(HttpResponse::Ok().json(response))
}

fn parse_store(raw: &str) -> Result<Store, HttpResponse> {
    raw.parse::<Store>().map_err(|e| {
        HttpResponse::BadRequest().json(ApiResponse::<()>::error(e))
    })
}

/// Ranked product search, against a single store or all of them.
pub async fn search(
    params: web::Query<SearchParams>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let text = params.q.as_deref().unwrap_or("").trim().to_string();
    if text.is_empty() {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error("missing query parameter: q")));
    }

    let query = SearchQuery {
        text,
        page: params.page.unwrap_or(1).max(1),
        page_size: params.page_size.unwrap_or(20).clamp(1, MAX_PAGE_SIZE),
        original_store: None,
    };

    tracing::info!(
        store = params.store.as_deref().unwrap_or("all"),
        q = %query.text,
        page = query.page,
        "search requested"
    );

    let page = match params.store.as_deref() {
        None | Some("all") => state.aggregator.search_all(&query).await,
        Some(raw) => {
            let store = match parse_store(raw) {
                Ok(store) => store,
                Err(resp) => return Ok(resp),
            };
            let catalog = match state.catalog_for(store) {
                Some(catalog) => catalog,
                None => {
                    return Ok(HttpResponse::BadRequest()
                        .json(ApiResponse::<()>::error("store not configured")))
                }
            };
            // The client cascade already absorbs upstream failure; an error
            // here is unexpected and degrades to an empty page.
            let products = match catalog
                .search(&query.text, query.page, query.page_size)
                .await
            {
                Ok(products) => products,
                Err(err) => {
                    tracing::warn!(store = %store, error = %err, "store search failed");
                    Vec::new()
                }
            };
            let full_page = products.len() as u32 >= query.page_size;
            let products = relevance::filter_products(products, &query);
            SearchPage {
                total: products.len() as u64,
                page: query.page,
                page_size: query.page_size,
                has_more: full_page,
                products,
            }
        }
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(page)))
}

/// Cross-store comparison with best-price derivation.
pub async fn compare(
    params: web::Query<CompareParams>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let name = params.name.as_deref().unwrap_or("").trim();
    if name.is_empty() {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error("missing query parameter: name")));
    }

    let original_store = match params.original_store.as_deref() {
        Some(raw) => match parse_store(raw) {
            Ok(store) => Some(store),
            Err(resp) => return Ok(resp),
        },
        None => None,
    };

    tracing::info!(
        name = %name,
        barcode = params.barcode.as_deref().unwrap_or(""),
        "comparison requested"
    );

    match state
        .aggregator
        .compare(name, params.barcode.as_deref(), original_store)
        .await
    {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(CatalogError::Validation(msg)) => {
            Ok(HttpResponse::BadRequest().json(ApiResponse::<()>::error(msg)))
        }
        Err(err) => {
            tracing::error!(error = %err, "comparison failed unexpectedly");
            Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("comparison failed")))
        }
    }
}

/// Exact barcode lookup against one store.
pub async fn lookup(
    params: web::Query<LookupParams>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let code = params.code.as_deref().unwrap_or("").trim();
    if code.is_empty() {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error("missing query parameter: code")));
    }
    let raw_store = match params.store.as_deref() {
        Some(raw) => raw,
        None => {
            return Ok(HttpResponse::BadRequest()
                .json(ApiResponse::<()>::error("missing query parameter: store")))
        }
    };
    let store = match parse_store(raw_store) {
        Ok(store) => store,
        Err(resp) => return Ok(resp),
    };
    let catalog = match state.catalog_for(store) {
        Some(catalog) => catalog,
        None => {
            return Ok(
                HttpResponse::BadRequest().json(ApiResponse::<()>::error("store not configured"))
            )
        }
    };

    match catalog.lookup_by_code(code).await {
        Ok(product) => Ok(HttpResponse::Ok().json(ApiResponse::success(product))),
        Err(err) if err.is_not_found() => {
            Ok(HttpResponse::NotFound()
                .json(ApiResponse::<()>::error("no verified match for code")))
        }
        Err(CatalogError::Validation(msg)) => {
            Ok(HttpResponse::BadRequest().json(ApiResponse::<()>::error(msg)))
        }
        Err(err) => {
            tracing::error!(store = %store, error = %err, "barcode lookup failed");
            Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("lookup failed")))
        }
    }
}
