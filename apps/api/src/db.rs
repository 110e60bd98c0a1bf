use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Idempotent DDL run once at startup. Each statement is executed separately
/// because the extended query protocol rejects multi-statement strings.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS user_repo_preferences (
        id BIGSERIAL PRIMARY KEY,
        user_id TEXT NOT NULL,
        preference_type VARCHAR(50) NOT NULL,
        preference_value TEXT NOT NULL,
        validated BOOLEAN NOT NULL DEFAULT false,
        confidence DOUBLE PRECISION,
        raw_text TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS user_repo_preferences_unique_value
        ON user_repo_preferences (user_id, preference_type, LOWER(preference_value))
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id BIGSERIAL PRIMARY KEY,
        slug TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        company_name TEXT NOT NULL,
        location TEXT NOT NULL,
        is_remote BOOLEAN NOT NULL DEFAULT false,
        compensation TEXT,
        role_category TEXT,
        description_snippet TEXT,
        posted_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        source_url TEXT NOT NULL UNIQUE,
        job_source TEXT NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT true,
        is_fractional BOOLEAN NOT NULL DEFAULT true,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

/// Creates the tables and indexes this service owns if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Database schema verified ({} statements)", SCHEMA.len());
    Ok(())
}
