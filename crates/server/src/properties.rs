//! Listing endpoints.
//!
//! - `GET  /properties`        - every listing, newest first (public)
//! - `POST /api/v1/properties` - create a listing and notify the automation webhook;
//!   needs `Authorization: Bearer <server.admin_token>` and is only mounted
//!   when that token is configured

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

use intake_agent::ListingError;
use intake_core::money::format_price;
use intake_core::{ApplicationError, NewProperty, Property};
use intake_whatsapp::tokens_match;

use crate::app::AppState;

pub fn router(state: AppState) -> Router {
    let router = Router::new().route("/properties", get(list_properties));
    let router = if state.admin_token.is_some() {
        router.route("/api/v1/properties", post(create_property))
    } else {
        warn!(
            event_name = "api.properties.create_disabled",
            correlation_id = "bootstrap",
            "server.admin_token not set; listing creation is not mounted"
        );
        router
    };
    router.with_state(state)
}

#[derive(Debug, Serialize)]
pub struct PropertyView {
    pub id: String,
    pub property_identifier: String,
    pub name: String,
    pub description: String,
    /// Two-decimal string, e.g. `"185000.00"`.
    pub price: String,
    pub location: String,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub is_available: bool,
    pub image: String,
    pub image_urls: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl From<Property> for PropertyView {
    fn from(property: Property) -> Self {
        Self {
            id: property.id.0,
            property_identifier: property.property_identifier.0,
            name: property.name,
            description: property.description,
            price: plain_price(&property.price),
            location: property.location,
            bedrooms: property.bedrooms,
            bathrooms: property.bathrooms,
            is_available: property.is_available,
            image: format!("/media/{}", property.image.trim_start_matches('/')),
            image_urls: property.image_urls,
            created_at: property.created_at,
        }
    }
}

fn plain_price(price: &Decimal) -> String {
    format_price(price).replace(',', "")
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: &'static str,
    pub detail: String,
    pub correlation_id: String,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

fn api_error(error: ListingError) -> (StatusCode, Json<ApiError>) {
    let correlation_id = Uuid::new_v4().to_string();
    error!(
        event_name = "api.properties.failed",
        correlation_id = %correlation_id,
        error = %error,
        "property request failed"
    );

    let interface = ApplicationError::from(error).into_interface(correlation_id);
    let status =
        StatusCode::from_u16(interface.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (
        status,
        Json(ApiError {
            error: interface.user_message(),
            detail: interface.detail().to_string(),
            correlation_id: interface.correlation_id().to_string(),
        }),
    )
}

pub async fn list_properties(State(state): State<AppState>) -> ApiResult<Json<Vec<PropertyView>>> {
    let properties = state.listings.list().await.map_err(api_error)?;
    Ok(Json(properties.into_iter().map(PropertyView::from).collect()))
}

fn unauthorized() -> (StatusCode, Json<ApiError>) {
    let correlation_id = Uuid::new_v4().to_string();
    warn!(
        event_name = "api.properties.unauthorized",
        correlation_id = %correlation_id,
        "listing creation rejected: missing or wrong bearer token"
    );
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiError {
            error: "A valid admin token is required to create listings.",
            detail: "missing or invalid bearer token".to_string(),
            correlation_id,
        }),
    )
}

fn authorize(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let Some(expected) = state.admin_token.as_ref() else {
        return Err(unauthorized());
    };
    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    match presented {
        Some(token) if tokens_match(expected.expose_secret(), token) => Ok(()),
        _ => Err(unauthorized()),
    }
}

pub async fn create_property(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(listing): Json<NewProperty>,
) -> ApiResult<(StatusCode, Json<PropertyView>)> {
    authorize(&state, &headers)?;
    let property = state.listings.create(listing).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(PropertyView::from(property))))
}
