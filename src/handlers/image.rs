//! The service's one route: resolve a signed, parsed rendition request
//! to bytes, by way of the coalescing cache and the image processor.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::fingerprint::Fingerprint;
use crate::params::{self, PathParams, QueryParams};
use crate::router::AppState;
use crate::signer::Signer;

/// Cache-Control sent on every successful rendition.
const CACHE_CONTROL: &str =
    "public, max-age=2592000, stale-while-revalidate=60, stale-if-error=43200, immutable";

pub async fn render(
    State(state): State<Arc<AppState>>,
    Extension(cancel): Extension<CancellationToken>,
    Path(path): Path<PathParams>,
    Query(query): Query<QueryParams>,
    axum::extract::RawQuery(raw_query): axum::extract::RawQuery,
) -> Result<Response, AppError> {
    let raw_path = format!("/id/{}/{}/{}", path.id, path.width, path.height_ext);
    let pairs = parse_query_pairs(raw_query.as_deref().unwrap_or(""));

    // A missing `hmac` is a malformed request, not a tampered one: it
    // never reaches signature verification, so it reports as a
    // parameter error per spec.md §8 scenario 4 ("Invalid parameters"),
    // distinct from `AppError::InvalidSignature` for a present-but-wrong
    // signature.
    let signature = query
        .hmac
        .clone()
        .ok_or_else(|| AppError::InvalidParameters("missing hmac".into()))?;
    let canonical = Signer::canonical_form(&raw_path, &pairs);
    let valid = state
        .signer
        .verify(&canonical, &signature)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !valid {
        return Err(AppError::InvalidSignature);
    }

    let params = params::parse(Path(path), Query(query))?;
    let fingerprint = Fingerprint::from(&params);
    let content_type = params.extension.content_type();
    let source_id = params.id.clone();

    let processor = Arc::clone(&state.processor);
    let cancel_for_compute = cancel.clone();
    let bytes = state
        .cache
        .get_or_compute(fingerprint.clone(), cancel, move || async move {
            processor.render(&params, cancel_for_compute).await
        })
        .await?;

    let mut response = bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("inline; filename=\"{fingerprint}\""))
            .unwrap_or_else(|_| HeaderValue::from_static("inline")),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CACHE_CONTROL),
    );
    if let Ok(value) = HeaderValue::from_str(&source_id) {
        headers.insert("picsum-id", value);
    }
    headers.insert("timing-allow-origin", HeaderValue::from_static("*"));

    Ok(response)
}

fn parse_query_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}
