//! PostgreSQL catalog of brands and registered domains.

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::brand::Brand;
use crate::models::domain::{DomainRecord, DomainRow};
use crate::repositories::CatalogRepository;

/// Columns selected for a [`DomainRow`].
const DOMAIN_COLUMNS: &str = r#"
    d.id, d.domain, d.note, d.is_active, d.created_at,
    b.id AS brand_id, b.code AS brand_code, b.name AS brand_name, b.color AS brand_color
"#;

#[derive(Clone, Debug)]
pub struct PgCatalogRepository {
    pool: DbPool,
}

impl PgCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn find_active_brands(&self) -> Result<Vec<Brand>, AppError> {
        let brands = sqlx::query_as::<_, Brand>(
            "SELECT id, code, name, color, is_active, created_at FROM brands WHERE is_active = true ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(brands)
    }

    async fn find_brand(&self, id: Uuid) -> Result<Option<Brand>, AppError> {
        let brand = sqlx::query_as::<_, Brand>(
            "SELECT id, code, name, color, is_active, created_at FROM brands WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(brand)
    }

    async fn find_active_domains(&self) -> Result<Vec<DomainRecord>, AppError> {
        // Domains of inactive brands are excluded along with inactive domains
        let rows = sqlx::query_as::<_, DomainRow>(&format!(
            r#"
            SELECT {DOMAIN_COLUMNS}
            FROM domains d
            JOIN brands b ON b.id = d.brand_id
            WHERE d.is_active = true AND b.is_active = true
            ORDER BY d.created_at
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DomainRecord::from).collect())
    }

    async fn find_active_domain(
        &self,
        brand_id: Uuid,
        host_key: &str,
        path_prefix: &str,
    ) -> Result<Option<DomainRecord>, AppError> {
        let row = sqlx::query_as::<_, DomainRow>(&format!(
            r#"
            SELECT {DOMAIN_COLUMNS}
            FROM domains d
            JOIN brands b ON b.id = d.brand_id
            WHERE d.brand_id = $1 AND d.host_key = $2 AND d.path_prefix = $3 AND d.is_active = true
            "#
        ))
        .bind(brand_id)
        .bind(host_key)
        .bind(path_prefix)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(DomainRecord::from))
    }

    async fn insert_domain(&self, domain: &DomainRecord) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO domains (id, brand_id, domain, note, is_active, host_key, root_key, path_prefix)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(domain.id)
        .bind(domain.brand.id)
        .bind(&domain.domain)
        .bind(&domain.note)
        .bind(domain.is_active)
        .bind(domain.host_key())
        .bind(domain.root_key())
        .bind(domain.path_prefix())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                AppError::InvalidRequest(format!(
                    "Domain {} is already registered for this brand",
                    domain.host_key()
                )),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn deactivate_domain(&self, id: Uuid) -> Result<Option<DomainRecord>, AppError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE domains SET is_active = false, updated_at = NOW() WHERE id = $1 AND is_active = true",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let row = sqlx::query_as::<_, DomainRow>(&format!(
            r#"
            SELECT {DOMAIN_COLUMNS}
            FROM domains d
            JOIN brands b ON b.id = d.brand_id
            WHERE d.id = $1
            "#
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(DomainRecord::from(row)))
    }
}
