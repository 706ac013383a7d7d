//! Company identifier persistence

use async_trait::async_trait;
use chrono::Utc;
use regid_common::{Error, Result};
use sqlx::SqlitePool;

use crate::types::AppliedIdentifier;

/// Status written alongside an auto-applied identifier
pub const VALIDATED_STATUS: &str = "validado";

/// Persistence collaborator for auto-applied identifiers
#[async_trait]
pub trait CompanyStore: Send + Sync {
    /// Record `applied` on company `company_id`
    ///
    /// # Errors
    /// `Error::NotFound` if no company has that id.
    async fn apply_identifier(&self, company_id: &str, applied: &AppliedIdentifier) -> Result<()>;
}

#[derive(Clone)]
pub struct SqliteCompanyStore {
    pool: SqlitePool,
}

impl SqliteCompanyStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CompanyStore for SqliteCompanyStore {
    async fn apply_identifier(&self, company_id: &str, applied: &AppliedIdentifier) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            UPDATE companies
            SET cnpj = ?, cnpj_status = ?, cnpj_confidence = ?, cnpj_source = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(applied.identifier.as_str())
        .bind(VALIDATED_STATUS)
        .bind(applied.confidence as i64)
        .bind(applied.source.as_str())
        .bind(&updated_at)
        .bind(company_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("company {}", company_id)));
        }

        tracing::info!(
            company_id,
            cnpj = %applied.identifier,
            confidence = applied.confidence,
            source = %applied.source,
            "Identifier applied to company"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_tables;
    use crate::types::Source;
    use regid_common::Cnpj;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::Row;

    /// Company row as stored
    #[derive(Debug, Clone, PartialEq)]
    struct CompanyRecord {
        id: String,
        name: String,
        cnpj: Option<String>,
        cnpj_status: Option<String>,
        cnpj_confidence: Option<i64>,
        cnpj_source: Option<String>,
        updated_at: Option<String>,
    }

    impl SqliteCompanyStore {
        /// Insert a company without an identifier (no-op if the id exists)
        async fn insert_company(&self, id: &str, name: &str) -> Result<()> {
            sqlx::query("INSERT INTO companies (id, name) VALUES (?, ?) ON CONFLICT(id) DO NOTHING")
                .bind(id)
                .bind(name)
                .execute(&self.pool)
                .await?;
            Ok(())
        }

        async fn get_company(&self, id: &str) -> Result<Option<CompanyRecord>> {
            let row = sqlx::query(
                r#"
                SELECT id, name, cnpj, cnpj_status, cnpj_confidence, cnpj_source, updated_at
                FROM companies
                WHERE id = ?
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

            Ok(row.map(|row| CompanyRecord {
                id: row.get("id"),
                name: row.get("name"),
                cnpj: row.get("cnpj"),
                cnpj_status: row.get("cnpj_status"),
                cnpj_confidence: row.get("cnpj_confidence"),
                cnpj_source: row.get("cnpj_source"),
                updated_at: row.get("updated_at"),
            }))
        }
    }

    async fn store() -> SqliteCompanyStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_tables(&pool).await.unwrap();
        SqliteCompanyStore::new(pool)
    }

    fn applied() -> AppliedIdentifier {
        AppliedIdentifier {
            identifier: Cnpj::parse("53.113.791/0001-22").unwrap(),
            confidence: 96,
            source: Source::ReceitaWs,
        }
    }

    #[tokio::test]
    async fn test_apply_updates_company() {
        let store = store().await;
        store.insert_company("c-1", "TOTVS").await.unwrap();

        store.apply_identifier("c-1", &applied()).await.unwrap();

        let company = store.get_company("c-1").await.unwrap().unwrap();
        assert_eq!(company.id, "c-1");
        assert_eq!(company.cnpj.as_deref(), Some("53113791000122"));
        assert_eq!(company.cnpj_status.as_deref(), Some(VALIDATED_STATUS));
        assert_eq!(company.cnpj_confidence, Some(96));
        assert_eq!(company.cnpj_source.as_deref(), Some("receitaws"));
        assert!(company.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_unknown_company_is_not_found() {
        let store = store().await;
        let result = store.apply_identifier("missing", &applied()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let store = store().await;
        store.insert_company("c-1", "TOTVS").await.unwrap();
        store.insert_company("c-1", "Other").await.unwrap();

        let company = store.get_company("c-1").await.unwrap().unwrap();
        assert_eq!(company.name, "TOTVS");
        assert!(company.cnpj.is_none());
        assert!(store.get_company("c-2").await.unwrap().is_none());
    }
}
