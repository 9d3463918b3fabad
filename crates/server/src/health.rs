//! `GET /health`: 200 when the database answers and the schema is current,
//! 503 otherwise.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use intake_db::migrations::MIGRATOR;
use intake_db::DbPool;
use serde::Serialize;

const READY: &str = "ready";
const DEGRADED: &str = "degraded";

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

impl HealthCheck {
    fn ready(detail: impl Into<String>) -> Self {
        Self { status: READY, detail: detail.into() }
    }

    fn degraded(detail: impl Into<String>) -> Self {
        Self { status: DEGRADED, detail: detail.into() }
    }

    fn is_ready(&self) -> bool {
        self.status == READY
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub database: HealthCheck,
    pub schema: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let schema = if database.is_ready() {
        schema_check(&state.db_pool).await
    } else {
        HealthCheck::degraded("skipped: database unreachable")
    };
    let ready = database.is_ready() && schema.is_ready();

    let payload = HealthResponse {
        status: if ready { READY } else { DEGRADED },
        service: HealthCheck::ready(concat!("intake-server ", env!("CARGO_PKG_VERSION"))),
        database,
        schema,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck::ready("database query succeeded"),
        Err(error) => HealthCheck::degraded(format!("database query failed: {error}")),
    }
}

async fn schema_check(pool: &DbPool) -> HealthCheck {
    let expected = MIGRATOR.iter().filter(|m| !m.migration_type.is_down_migration()).count();
    let applied = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1",
    )
    .fetch_one(pool)
    .await;

    match applied {
        Ok(applied) if applied as usize >= expected => {
            HealthCheck::ready(format!("{applied} migration(s) applied"))
        }
        Ok(applied) => HealthCheck::degraded(format!("{applied} of {expected} migration(s) applied")),
        Err(error) => HealthCheck::degraded(format!("migration history unavailable: {error}")),
    }
}
