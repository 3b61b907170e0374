use log::info;
use sqlx::{PgPool, Pool, Postgres};

pub type Database = Pool<Postgres>;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        doc_type TEXT NOT NULL,
        rev BIGINT NOT NULL DEFAULT 1,
        body JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS documents_doc_type_idx ON documents (doc_type)",
    "CREATE INDEX IF NOT EXISTS documents_item_id_idx ON documents ((body ->> 'itemId')) \
     WHERE doc_type = 'inventoryItem'",
    "CREATE INDEX IF NOT EXISTS documents_barcode_idx ON documents ((body ->> 'barcode')) \
     WHERE doc_type = 'inventoryItem'",
];

pub async fn create_database_pool(database_url: &str) -> Result<Database, sqlx::Error> {
    let pool = PgPool::connect(database_url).await?;

    // Test the connection
    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    info!("Connected to database successfully");
    Ok(pool)
}

pub async fn ensure_schema(pool: &Database) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
