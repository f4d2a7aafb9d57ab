//! Template tables.
//!
//! Table and column names are shared with existing deployments and must not
//! change.

use sqlx::AnyPool;

/// Template type registry table
pub const TEMPLATE_TYPE_TABLE: &str = "IDN_NOTIF_TEMPLATE_TYPE";

/// Template content table
pub const TEMPLATE_TABLE: &str = "IDN_NOTIF_TEMPLATE";

const CREATE_TEMPLATE_TYPE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS IDN_NOTIF_TEMPLATE_TYPE (
    ID VARCHAR(36) NOT NULL PRIMARY KEY,
    DISPLAY_NAME VARCHAR(255) NOT NULL,
    TEMPLATE_TYPE VARCHAR(255) NOT NULL,
    CHANNEL VARCHAR(32) NOT NULL,
    TENANT_UUID VARCHAR(64) NOT NULL,
    CONSTRAINT UQ_NOTIF_TEMPLATE_TYPE UNIQUE (TEMPLATE_TYPE, CHANNEL, TENANT_UUID)
)
"#;

const CREATE_TEMPLATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS IDN_NOTIF_TEMPLATE (
    TEMPLATE_TYPE_ID VARCHAR(36) NOT NULL,
    LOCALE VARCHAR(50) NOT NULL,
    SUBJECT TEXT,
    BODY TEXT NOT NULL,
    FOOTER TEXT,
    CONTENT_TYPE VARCHAR(100),
    CONSTRAINT UQ_NOTIF_TEMPLATE UNIQUE (TEMPLATE_TYPE_ID, LOCALE),
    CONSTRAINT FK_NOTIF_TEMPLATE_TYPE FOREIGN KEY (TEMPLATE_TYPE_ID)
        REFERENCES IDN_NOTIF_TEMPLATE_TYPE (ID) ON DELETE CASCADE
)
"#;

/// Create both template tables if they do not exist yet.
pub async fn ensure_schema(pool: &AnyPool) -> Result<(), sqlx::Error> {
    for statement in [CREATE_TEMPLATE_TYPE_TABLE, CREATE_TEMPLATE_TABLE] {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::debug!(
        tables = ?[TEMPLATE_TYPE_TABLE, TEMPLATE_TABLE],
        "Template tables ensured"
    );
    Ok(())
}
