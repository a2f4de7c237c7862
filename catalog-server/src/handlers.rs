use actix_web::error::{InternalError, JsonPayloadError, QueryPayloadError};
use actix_web::{web, HttpRequest, HttpResponse};
use catalog::pagination::PAGE_PARAM;
use catalog::{CatalogError, Page};
use serde::Serialize;
use std::collections::HashMap;

use crate::AppState;

type Query = web::Query<HashMap<String, String>>;

/// Configure all API routes. Paths are registered without a trailing slash;
/// `NormalizePath::trim` maps `/books/` onto `/books`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(api_root)))
        .service(web::resource("/status").route(web::get().to(status)))
        // Authors
        .service(
            web::resource("/authors")
                .name("author-list")
                .route(web::get().to(list_authors))
                .route(web::post().to(create_author)),
        )
        .service(
            web::resource("/authors/{id}")
                .name("author-detail")
                .route(web::get().to(get_author))
                .route(web::put().to(update_author))
                .route(web::patch().to(partial_update_author))
                .route(web::delete().to(delete_author)),
        )
        // Books
        .service(
            web::resource("/books")
                .name("book-list")
                .route(web::get().to(list_books))
                .route(web::post().to(create_book)),
        )
        .service(
            web::resource("/books/{id}")
                .name("book-detail")
                .route(web::get().to(get_book))
                .route(web::put().to(update_book))
                .route(web::patch().to(partial_update_book))
                .route(web::delete().to(delete_book)),
        );
}

/// JSON body extraction that reports unparsable payloads in the API's error shape.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response = match &err {
            JsonPayloadError::ContentType => HttpResponse::UnsupportedMediaType().json(
                serde_json::json!({ "detail": "Unsupported media type; expected application/json" }),
            ),
            other => err_response(CatalogError::MalformedBody(other.to_string())),
        };
        InternalError::from_response(err, response).into()
    })
}

/// Query-string extraction with the same JSON error body as the rest of the API.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(query_error)
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = HttpResponse::BadRequest().json(serde_json::json!({
        "detail": format!("Query parse error - {err}")
    }));
    InternalError::from_response(err, response).into()
}

// ── Helpers ─────────────────────────────────────────────────────────

fn ok_json(value: impl Serialize) -> HttpResponse {
    HttpResponse::Ok().json(value)
}

fn created_json(value: impl Serialize) -> HttpResponse {
    HttpResponse::Created().json(value)
}

fn err_response(e: CatalogError) -> HttpResponse {
    match &e {
        CatalogError::Validation(errors) => HttpResponse::BadRequest().json(errors),
        CatalogError::NotFound { .. } => HttpResponse::NotFound().json(serde_json::json!({
            "detail": "Not found."
        })),
        CatalogError::InvalidPage => HttpResponse::NotFound().json(serde_json::json!({
            "detail": "Invalid page."
        })),
        CatalogError::MalformedBody(reason) => HttpResponse::BadRequest().json(serde_json::json!({
            "detail": format!("JSON parse error - {reason}")
        })),
        _ => {
            log::error!("Internal error: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "detail": "Internal server error"
            }))
        }
    }
}

/// Identifiers that are not integers cannot name a record.
fn parse_id(resource: &'static str, raw: &str) -> Result<i64, CatalogError> {
    raw.parse().map_err(|_| CatalogError::NotFound {
        resource,
        id: raw.to_string(),
    })
}

/// List response body. `next` and `previous` are absolute links.
#[derive(Serialize)]
struct ListEnvelope<T> {
    count: u64,
    next: Option<String>,
    previous: Option<String>,
    results: Vec<T>,
}

fn envelope<T>(req: &HttpRequest, page: Page<T>) -> ListEnvelope<T> {
    ListEnvelope {
        count: page.count,
        next: page.next.map(|n| page_url(req, n)),
        previous: page.previous.map(|n| page_url(req, n)),
        results: page.results,
    }
}

/// The current URL with `page` replaced. Page 1 drops the parameter.
/// Keys are compared decoded, so `pag%65=2` counts as `page`.
fn page_url(req: &HttpRequest, number: u64) -> String {
    let mut url = req.full_url();
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != PAGE_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut().clear().extend_pairs(&kept);
    if number > 1 {
        url.query_pairs_mut().append_pair(PAGE_PARAM, &number.to_string());
    }
    if url.query() == Some("") {
        url.set_query(None);
    }
    url.to_string()
}

// ── Root ────────────────────────────────────────────────────────────

async fn api_root(req: HttpRequest) -> HttpResponse {
    let mut links = serde_json::Map::new();
    for (key, route) in [("authors", "author-list"), ("books", "book-list")] {
        match req.url_for_static(route) {
            Ok(url) => {
                links.insert(key.to_string(), serde_json::Value::String(url.to_string()));
            }
            Err(e) => return err_response(CatalogError::Other(e.to_string())),
        }
    }
    ok_json(links)
}

async fn status(state: web::Data<AppState>) -> HttpResponse {
    match state.catalog.status() {
        Ok(v) => ok_json(v),
        Err(e) => err_response(e),
    }
}

// ── Authors ─────────────────────────────────────────────────────────

async fn list_authors(state: web::Data<AppState>, req: HttpRequest, query: Query) -> HttpResponse {
    match state.catalog.authors().list(&query) {
        Ok(page) => ok_json(envelope(&req, page)),
        Err(e) => err_response(e),
    }
}

async fn get_author(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    match parse_id("authors", &path).and_then(|id| state.catalog.authors().retrieve(id)) {
        Ok(v) => ok_json(v),
        Err(e) => err_response(e),
    }
}

async fn create_author(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> HttpResponse {
    match state.catalog.authors().create(&body) {
        Ok(v) => created_json(v),
        Err(e) => err_response(e),
    }
}

async fn update_author(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<serde_json::Value>,
) -> HttpResponse {
    match parse_id("authors", &path).and_then(|id| state.catalog.authors().update(id, &body)) {
        Ok(v) => ok_json(v),
        Err(e) => err_response(e),
    }
}

async fn partial_update_author(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<serde_json::Value>,
) -> HttpResponse {
    match parse_id("authors", &path)
        .and_then(|id| state.catalog.authors().partial_update(id, &body))
    {
        Ok(v) => ok_json(v),
        Err(e) => err_response(e),
    }
}

async fn delete_author(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    match parse_id("authors", &path).and_then(|id| state.catalog.authors().delete(id)) {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => err_response(e),
    }
}

// ── Books ───────────────────────────────────────────────────────────

async fn list_books(state: web::Data<AppState>, req: HttpRequest, query: Query) -> HttpResponse {
    match state.catalog.books().list(&query) {
        Ok(page) => ok_json(envelope(&req, page)),
        Err(e) => err_response(e),
    }
}

async fn get_book(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    match parse_id("books", &path).and_then(|id| state.catalog.books().retrieve(id)) {
        Ok(v) => ok_json(v),
        Err(e) => err_response(e),
    }
}

async fn create_book(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> HttpResponse {
    match state.catalog.books().create(&body) {
        Ok(v) => created_json(v),
        Err(e) => err_response(e),
    }
}

async fn update_book(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<serde_json::Value>,
) -> HttpResponse {
    match parse_id("books", &path).and_then(|id| state.catalog.books().update(id, &body)) {
        Ok(v) => ok_json(v),
        Err(e) => err_response(e),
    }
}

async fn partial_update_book(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<serde_json::Value>,
) -> HttpResponse {
    match parse_id("books", &path).and_then(|id| state.catalog.books().partial_update(id, &body)) {
        Ok(v) => ok_json(v),
        Err(e) => err_response(e),
    }
}

async fn delete_book(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    match parse_id("books", &path).and_then(|id| state.catalog.books().delete(id)) {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => err_response(e),
    }
}
