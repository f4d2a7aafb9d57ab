//! Relational template backend.
//!
//! Stores template types in `IDN_NOTIF_TEMPLATE_TYPE` and their localized
//! content in `IDN_NOTIF_TEMPLATE`, both partitioned by tenant key and
//! channel. Every write runs inside one transaction covering the type lookup,
//! the optional type creation and the template write.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::AnyConnection;
use uuid::Uuid;

use crate::database::DatabasePool;
use crate::error::{ErrorCode, StoreResult, TemplateStoreError};
use crate::metrics::FacadeMetrics;
use crate::template::{normalize_template_type, with_utf8_charset, NotificationChannel, NotificationTemplate};
use crate::tenant::{TenantKey, TenantResolver};

use super::backend::{resolve_tenant_for_lookup, NotificationTemplateBackend};

const SELECT_TYPE_ID: &str = "SELECT ID FROM IDN_NOTIF_TEMPLATE_TYPE \
    WHERE TEMPLATE_TYPE = $1 AND CHANNEL = $2 AND TENANT_UUID = $3";

const INSERT_TYPE: &str = "INSERT INTO IDN_NOTIF_TEMPLATE_TYPE \
    (ID, DISPLAY_NAME, TEMPLATE_TYPE, CHANNEL, TENANT_UUID) VALUES ($1, $2, $3, $4, $5)";

const SELECT_TYPE_NAMES: &str = "SELECT DISPLAY_NAME FROM IDN_NOTIF_TEMPLATE_TYPE \
    WHERE CHANNEL = $1 AND TENANT_UUID = $2 ORDER BY DISPLAY_NAME";

const DELETE_TEMPLATES_OF_TYPE: &str = "DELETE FROM IDN_NOTIF_TEMPLATE WHERE TEMPLATE_TYPE_ID = $1";

const DELETE_TYPE: &str = "DELETE FROM IDN_NOTIF_TEMPLATE_TYPE WHERE ID = $1";

const SELECT_TEMPLATE_EXISTS: &str = "SELECT LOCALE FROM IDN_NOTIF_TEMPLATE \
    WHERE TEMPLATE_TYPE_ID = $1 AND LOCALE = $2";

const INSERT_TEMPLATE: &str = "INSERT INTO IDN_NOTIF_TEMPLATE \
    (TEMPLATE_TYPE_ID, LOCALE, SUBJECT, BODY, FOOTER, CONTENT_TYPE) VALUES ($1, $2, $3, $4, $5, $6)";

const UPDATE_TEMPLATE: &str = "UPDATE IDN_NOTIF_TEMPLATE \
    SET SUBJECT = $1, BODY = $2, FOOTER = $3, CONTENT_TYPE = $4 \
    WHERE TEMPLATE_TYPE_ID = $5 AND LOCALE = $6";

const DELETE_TEMPLATE: &str = "DELETE FROM IDN_NOTIF_TEMPLATE WHERE LOCALE = $1 AND TEMPLATE_TYPE_ID IN \
    (SELECT ID FROM IDN_NOTIF_TEMPLATE_TYPE WHERE TEMPLATE_TYPE = $2 AND CHANNEL = $3 AND TENANT_UUID = $4)";

const SELECT_TEMPLATE_COLUMNS: &str = "SELECT t.DISPLAY_NAME, t.TEMPLATE_TYPE, n.LOCALE, \
    n.SUBJECT, n.BODY, n.FOOTER, n.CONTENT_TYPE \
    FROM IDN_NOTIF_TEMPLATE n JOIN IDN_NOTIF_TEMPLATE_TYPE t ON t.ID = n.TEMPLATE_TYPE_ID";

/// (DISPLAY_NAME, TEMPLATE_TYPE, LOCALE, SUBJECT, BODY, FOOTER, CONTENT_TYPE)
type TemplateRow = (
    String,
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
);

/// How a template write treats an existing (type, locale) row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Upsert,
    Exclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteOutcome {
    Inserted,
    Updated,
    AlreadyExists,
}

/// Relational template backend.
pub struct DatabaseTemplateBackend {
    /// Transactional connection provider
    pool: DatabasePool,

    /// Tenant domain -> tenant key
    tenants: Arc<dyn TenantResolver>,
}

impl DatabaseTemplateBackend {
    pub fn new(pool: DatabasePool, tenants: Arc<dyn TenantResolver>) -> Self {
        Self { pool, tenants }
    }

    fn row_to_template(row: TemplateRow, channel: NotificationChannel) -> NotificationTemplate {
        let (display_name, template_type, locale, subject, body, footer, content_type) = row;
        let content_type = match channel {
            NotificationChannel::Email => with_utf8_charset(content_type),
            NotificationChannel::Sms => content_type,
        };
        NotificationTemplate {
            display_name,
            template_type,
            channel,
            locale,
            subject,
            body,
            footer,
            content_type,
        }
    }

    async fn find_type_id(
        conn: &mut AnyConnection,
        template_type: &str,
        channel: NotificationChannel,
        tenant: &TenantKey,
    ) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(SELECT_TYPE_ID)
            .bind(template_type)
            .bind(channel.as_str())
            .bind(tenant.as_str())
            .fetch_optional(conn)
            .await?;
        Ok(row.map(|(id,)| id))
    }

    async fn insert_type(
        conn: &mut AnyConnection,
        display_name: &str,
        channel: NotificationChannel,
        tenant: &TenantKey,
    ) -> Result<String, sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(INSERT_TYPE)
            .bind(&id)
            .bind(display_name)
            .bind(normalize_template_type(display_name))
            .bind(channel.as_str())
            .bind(tenant.as_str())
            .execute(conn)
            .await?;
        Ok(id)
    }

    /// Look up the type id, creating the type when it is missing.
    async fn ensure_type(
        conn: &mut AnyConnection,
        display_name: &str,
        channel: NotificationChannel,
        tenant: &TenantKey,
    ) -> Result<String, sqlx::Error> {
        let template_type = normalize_template_type(display_name);
        if let Some(id) = Self::find_type_id(&mut *conn, &template_type, channel, tenant).await? {
            return Ok(id);
        }

        let id = Self::insert_type(conn, display_name, channel, tenant).await?;
        tracing::debug!(
            template_type = %display_name,
            channel = %channel,
            tenant = %tenant,
            "Created template type"
        );
        Ok(id)
    }

    async fn template_row_exists(
        conn: &mut AnyConnection,
        type_id: &str,
        locale: &str,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(SELECT_TEMPLATE_EXISTS)
            .bind(type_id)
            .bind(locale)
            .fetch_optional(conn)
            .await?;
        Ok(row.is_some())
    }

    /// Ensure the type, then insert or update the template row.
    async fn write_template_in(
        conn: &mut AnyConnection,
        template: &NotificationTemplate,
        tenant: &TenantKey,
        mode: WriteMode,
    ) -> Result<WriteOutcome, sqlx::Error> {
        let type_id =
            Self::ensure_type(&mut *conn, &template.display_name, template.channel, tenant).await?;

        if Self::template_row_exists(&mut *conn, &type_id, &template.locale).await? {
            if mode == WriteMode::Exclusive {
                return Ok(WriteOutcome::AlreadyExists);
            }
            sqlx::query(UPDATE_TEMPLATE)
                .bind(template.subject.clone())
                .bind(&template.body)
                .bind(template.footer.clone())
                .bind(template.content_type.clone())
                .bind(&type_id)
                .bind(&template.locale)
                .execute(conn)
                .await?;
            return Ok(WriteOutcome::Updated);
        }

        sqlx::query(INSERT_TEMPLATE)
            .bind(&type_id)
            .bind(&template.locale)
            .bind(template.subject.clone())
            .bind(&template.body)
            .bind(template.footer.clone())
            .bind(template.content_type.clone())
            .execute(conn)
            .await?;
        Ok(WriteOutcome::Inserted)
    }

    /// Run one template write in its own transaction.
    ///
    /// Nothing is committed unless the whole write succeeds.
    async fn write_template_tx(
        &self,
        template: &NotificationTemplate,
        tenant: &TenantKey,
        mode: WriteMode,
    ) -> Result<WriteOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        match Self::write_template_in(&mut tx, template, tenant, mode).await {
            Ok(WriteOutcome::AlreadyExists) => {
                tx.rollback().await?;
                Ok(WriteOutcome::AlreadyExists)
            }
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Failed to roll back template write");
                }
                Err(e)
            }
        }
    }

    /// Template write with one retry when a concurrent writer created the
    /// same type or template row first.
    async fn write_template(
        &self,
        template: &NotificationTemplate,
        tenant_domain: &str,
        mode: WriteMode,
        error_message: &'static str,
    ) -> StoreResult<WriteOutcome> {
        let tenant = self.tenants.resolve(tenant_domain).await?;

        let result = match self.write_template_tx(template, &tenant, mode).await {
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!(
                    template_type = %template.display_name,
                    locale = %template.locale,
                    tenant_domain = %tenant_domain,
                    "Concurrent write detected, retrying template write"
                );
                self.write_template_tx(template, &tenant, mode).await
            }
            other => other,
        };

        match result {
            Ok(outcome) => {
                tracing::debug!(
                    template_type = %template.display_name,
                    locale = %template.locale,
                    tenant_domain = %tenant_domain,
                    outcome = ?outcome,
                    "Template written"
                );
                Ok(outcome)
            }
            Err(e) if is_unique_violation(&e) && mode == WriteMode::Exclusive => {
                Ok(WriteOutcome::AlreadyExists)
            }
            Err(e) => Err(TemplateStoreError::database(error_message, e)),
        }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl NotificationTemplateBackend for DatabaseTemplateBackend {
    fn backend_type(&self) -> &'static str {
        "database"
    }

    async fn add_template_type(
        &self,
        display_name: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<()> {
        let tenant = self.tenants.resolve(tenant_domain).await?;
        let template_type = normalize_template_type(display_name);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| TemplateStoreError::database("Error while adding notification template type", e))?;

        let existing = Self::find_type_id(&mut tx, &template_type, channel, &tenant).await;
        let inserted = match existing {
            Ok(Some(_)) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Failed to roll back template type insert");
                }
                return Err(TemplateStoreError::new(
                    ErrorCode::DuplicateTemplateType,
                    format!("Notification template type already exists: {}", display_name),
                ));
            }
            Ok(None) => Self::insert_type(&mut tx, display_name, channel, &tenant).await,
            Err(e) => Err(e),
        };

        match inserted {
            Ok(_) => tx.commit().await.map_err(|e| {
                TemplateStoreError::database("Error while adding notification template type", e)
            })?,
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Failed to roll back template type insert");
                }
                // A concurrent writer created the same type first
                if is_unique_violation(&e) {
                    return Err(TemplateStoreError::new(
                        ErrorCode::DuplicateTemplateType,
                        format!("Notification template type already exists: {}", display_name),
                    ));
                }
                return Err(TemplateStoreError::database(
                    "Error while adding notification template type",
                    e,
                ));
            }
        }

        tracing::debug!(
            template_type = %display_name,
            channel = %channel,
            tenant_domain = %tenant_domain,
            "Template type added"
        );
        Ok(())
    }

    async fn delete_template_type(
        &self,
        display_name: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<()> {
        let tenant = self.tenants.resolve(tenant_domain).await?;
        let template_type = normalize_template_type(display_name);
        let map_err =
            |e| TemplateStoreError::database("Error while deleting notification template type", e);

        let mut tx = self.pool.begin().await.map_err(map_err)?;

        let result = async {
            if let Some(type_id) =
                Self::find_type_id(&mut tx, &template_type, channel, &tenant).await?
            {
                sqlx::query(DELETE_TEMPLATES_OF_TYPE)
                    .bind(&type_id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query(DELETE_TYPE).bind(&type_id).execute(&mut *tx).await?;
            }
            Ok::<(), sqlx::Error>(())
        }
        .await;

        match result {
            Ok(()) => tx.commit().await.map_err(map_err)?,
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Failed to roll back template type delete");
                }
                return Err(map_err(e));
            }
        }

        tracing::debug!(
            template_type = %display_name,
            channel = %channel,
            tenant_domain = %tenant_domain,
            "Template type deleted"
        );
        Ok(())
    }

    async fn list_template_types(
        &self,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<Vec<String>> {
        let tenant = self.tenants.resolve(tenant_domain).await?;

        let rows: Vec<(String,)> = sqlx::query_as(SELECT_TYPE_NAMES)
            .bind(channel.as_str())
            .bind(tenant.as_str())
            .fetch_all(self.pool.pool())
            .await
            .map_err(|e| {
                TemplateStoreError::database("Error while retrieving notification template types", e)
            })?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn template_type_exists(
        &self,
        display_name: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<bool> {
        let Some(tenant) = resolve_tenant_for_lookup(self.tenants.as_ref(), tenant_domain).await?
        else {
            return Ok(false);
        };
        let map_err =
            |e| TemplateStoreError::database("Error while retrieving notification template type", e);

        let mut conn = self.pool.pool().acquire().await.map_err(map_err)?;
        let type_id = Self::find_type_id(
            &mut conn,
            &normalize_template_type(display_name),
            channel,
            &tenant,
        )
        .await
        .map_err(map_err)?;
        Ok(type_id.is_some())
    }

    async fn add_or_update_template(
        &self,
        template: &NotificationTemplate,
        tenant_domain: &str,
    ) -> StoreResult<()> {
        self.write_template(
            template,
            tenant_domain,
            WriteMode::Upsert,
            "Error while updating notification template",
        )
        .await?;
        Ok(())
    }

    async fn add_template(
        &self,
        template: &NotificationTemplate,
        tenant_domain: &str,
    ) -> StoreResult<()> {
        match self
            .write_template(
                template,
                tenant_domain,
                WriteMode::Exclusive,
                "Error while adding notification template",
            )
            .await?
        {
            WriteOutcome::AlreadyExists => Err(TemplateStoreError::new(
                ErrorCode::DuplicateTemplate,
                format!(
                    "Notification template already exists: {} ({})",
                    template.display_name, template.locale
                ),
            )),
            _ => Ok(()),
        }
    }

    async fn add_default_templates(
        &self,
        templates: &[NotificationTemplate],
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<usize> {
        let mut added = 0;
        for template in templates {
            match self.add_template(template, tenant_domain).await {
                Ok(()) => {
                    tracing::debug!(
                        template_type = %template.display_name,
                        locale = %template.locale,
                        tenant_domain = %tenant_domain,
                        "Default template added"
                    );
                    added += 1;
                }
                Err(e) if e.is_conflict() => {
                    FacadeMetrics::record_seed_skipped(self.backend_type(), channel.as_str());
                    tracing::warn!(
                        template_type = %template.display_name,
                        locale = %template.locale,
                        tenant_domain = %tenant_domain,
                        "Template already exists in the database, ignoring addition"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(added)
    }

    async fn delete_template(
        &self,
        display_name: &str,
        locale: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<()> {
        let tenant = self.tenants.resolve(tenant_domain).await?;

        let mut tx = self.pool.begin().await.map_err(|e| {
            TemplateStoreError::database("Error while deleting notification template", e)
        })?;

        let result = sqlx::query(DELETE_TEMPLATE)
            .bind(locale)
            .bind(normalize_template_type(display_name))
            .bind(channel.as_str())
            .bind(tenant.as_str())
            .execute(&mut *tx)
            .await;

        match result {
            Ok(_) => tx.commit().await.map_err(|e| {
                TemplateStoreError::database("Error while deleting notification template", e)
            }),
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Failed to roll back template delete");
                }
                Err(TemplateStoreError::database(
                    "Error while deleting notification template",
                    e,
                ))
            }
        }
    }

    async fn get_template(
        &self,
        display_name: &str,
        locale: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<Option<NotificationTemplate>> {
        let tenant = self.tenants.resolve(tenant_domain).await?;
        let query = format!(
            "{} WHERE t.TEMPLATE_TYPE = $1 AND t.CHANNEL = $2 AND t.TENANT_UUID = $3 AND n.LOCALE = $4",
            SELECT_TEMPLATE_COLUMNS
        );

        let row: Option<TemplateRow> = sqlx::query_as(&query)
            .bind(normalize_template_type(display_name))
            .bind(channel.as_str())
            .bind(tenant.as_str())
            .bind(locale)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| {
                TemplateStoreError::database("Error while retrieving notification template", e)
            })?;

        Ok(row.map(|row| Self::row_to_template(row, channel)))
    }

    async fn template_exists(
        &self,
        display_name: &str,
        locale: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<bool> {
        let Some(tenant) = resolve_tenant_for_lookup(self.tenants.as_ref(), tenant_domain).await?
        else {
            return Ok(false);
        };
        let map_err =
            |e| TemplateStoreError::database("Error while retrieving notification template", e);

        let mut conn = self.pool.pool().acquire().await.map_err(map_err)?;
        let type_id = Self::find_type_id(
            &mut conn,
            &normalize_template_type(display_name),
            channel,
            &tenant,
        )
        .await
        .map_err(map_err)?;

        match type_id {
            Some(type_id) => Self::template_row_exists(&mut conn, &type_id, locale)
                .await
                .map_err(map_err),
            None => Ok(false),
        }
    }

    async fn list_all_templates(
        &self,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<Vec<NotificationTemplate>> {
        let tenant = self.tenants.resolve(tenant_domain).await?;
        let query = format!(
            "{} WHERE t.CHANNEL = $1 AND t.TENANT_UUID = $2 ORDER BY t.TEMPLATE_TYPE, n.LOCALE",
            SELECT_TEMPLATE_COLUMNS
        );

        let rows: Vec<TemplateRow> = sqlx::query_as(&query)
            .bind(channel.as_str())
            .bind(tenant.as_str())
            .fetch_all(self.pool.pool())
            .await
            .map_err(|e| {
                TemplateStoreError::database("Error while retrieving all notification templates", e)
            })?;

        Ok(rows
            .into_iter()
            .map(|row| Self::row_to_template(row, channel))
            .collect())
    }

    async fn list_templates_of_type(
        &self,
        display_name: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<Vec<NotificationTemplate>> {
        let tenant = self.tenants.resolve(tenant_domain).await?;
        let map_err =
            |e| TemplateStoreError::database("Error while retrieving notification templates", e);

        let mut conn = self.pool.pool().acquire().await.map_err(map_err)?;
        let type_id = Self::find_type_id(
            &mut conn,
            &normalize_template_type(display_name),
            channel,
            &tenant,
        )
        .await
        .map_err(map_err)?
        .ok_or_else(|| {
            TemplateStoreError::new(
                ErrorCode::TemplateTypeNotFound,
                format!("No template type found for the display name: {}", display_name),
            )
        })?;

        let query = format!("{} WHERE t.ID = $1 ORDER BY n.LOCALE", SELECT_TEMPLATE_COLUMNS);
        let rows: Vec<TemplateRow> = sqlx::query_as(&query)
            .bind(&type_id)
            .fetch_all(&mut *conn)
            .await
            .map_err(map_err)?;

        Ok(rows
            .into_iter()
            .map(|row| Self::row_to_template(row, channel))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::tenant::StaticTenantResolver;

    const TENANT: &str = "carbon.super";

    async fn backend() -> DatabaseTemplateBackend {
        let pool = DatabasePool::new(&DatabaseConfig::default()).await.unwrap();
        DatabaseTemplateBackend::new(pool, Arc::new(StaticTenantResolver::default()))
    }

    fn email(locale: &str, subject: &str) -> NotificationTemplate {
        NotificationTemplate::email(
            "Password Reset",
            locale,
            subject,
            "Click the link",
            "Regards",
            "text/html",
        )
    }

    #[tokio::test]
    async fn test_add_or_update_then_get() {
        let backend = backend().await;
        backend.add_or_update_template(&email("en_US", "first"), TENANT).await.unwrap();
        backend.add_or_update_template(&email("en_US", "second"), TENANT).await.unwrap();

        let template = backend
            .get_template("password reset", "en_US", NotificationChannel::Email, TENANT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(template.subject.as_deref(), Some("second"));
        assert_eq!(template.display_name, "Password Reset");
        assert_eq!(template.template_type, "passwordreset");
        assert_eq!(template.content_type.as_deref(), Some("text/html; charset=UTF-8"));

        // The type was created implicitly, exactly once
        let types = backend
            .list_template_types(NotificationChannel::Email, TENANT)
            .await
            .unwrap();
        assert_eq!(types, vec!["Password Reset".to_string()]);
    }

    #[tokio::test]
    async fn test_email_without_content_type_reads_with_charset() {
        let backend = backend().await;
        let mut template = email("en_US", "subject");
        template.content_type = None;
        backend.add_or_update_template(&template, TENANT).await.unwrap();

        let loaded = backend
            .get_template("Password Reset", "en_US", NotificationChannel::Email, TENANT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.content_type.as_deref(), Some("text/html; charset=UTF-8"));
    }

    #[tokio::test]
    async fn test_super_tenant_rows_use_padded_key() {
        let backend = backend().await;
        backend.add_template_type("OTP", NotificationChannel::Sms, TENANT).await.unwrap();

        let (tenant_uuid,): (String,) =
            sqlx::query_as("SELECT TENANT_UUID FROM IDN_NOTIF_TEMPLATE_TYPE")
                .fetch_one(backend.pool.pool())
                .await
                .unwrap();
        assert_eq!(tenant_uuid, TenantKey::super_tenant().as_str());
    }

    #[tokio::test]
    async fn test_duplicate_type_is_conflict() {
        let backend = backend().await;
        backend
            .add_template_type("Account Lock", NotificationChannel::Email, TENANT)
            .await
            .unwrap();

        let err = backend
            .add_template_type("accountlock", NotificationChannel::Email, TENANT)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateTemplateType);
        assert!(err.is_conflict());

        // Same name on another channel is a different type
        backend
            .add_template_type("Account Lock", NotificationChannel::Sms, TENANT)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_exclusive_add_does_not_overwrite() {
        let backend = backend().await;
        backend.add_template(&email("en_US", "original"), TENANT).await.unwrap();

        let err = backend.add_template(&email("en_US", "changed"), TENANT).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateTemplate);

        let template = backend
            .get_template("Password Reset", "en_US", NotificationChannel::Email, TENANT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(template.subject.as_deref(), Some("original"));
    }

    #[tokio::test]
    async fn test_delete_type_cascades() {
        let backend = backend().await;
        backend.add_or_update_template(&email("en_US", "a"), TENANT).await.unwrap();
        backend.add_or_update_template(&email("fr_FR", "b"), TENANT).await.unwrap();

        backend
            .delete_template_type("Password Reset", NotificationChannel::Email, TENANT)
            .await
            .unwrap();

        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM IDN_NOTIF_TEMPLATE")
            .fetch_one(backend.pool.pool())
            .await
            .unwrap();
        assert_eq!(rows, 0);
        assert!(!backend
            .template_type_exists("Password Reset", NotificationChannel::Email, TENANT)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_list_templates_of_missing_type() {
        let backend = backend().await;
        let err = backend
            .list_templates_of_type("Nothing", NotificationChannel::Email, TENANT)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TemplateTypeNotFound);
    }

    #[tokio::test]
    async fn test_unknown_tenant() {
        let backend = backend().await;
        assert!(!backend
            .template_exists("Password Reset", "en_US", NotificationChannel::Email, "ghost.org")
            .await
            .unwrap());

        let err = backend
            .list_template_types(NotificationChannel::Email, "ghost.org")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidTenant);
    }
}
