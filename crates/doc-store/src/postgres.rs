use async_trait::async_trait;
use common::{OrderId, ProductId, UserId, VariantKey};
use domain::access::Role;
use domain::cart::Cart;
use domain::catalog::Product;
use domain::order::Order;
use domain::store::{CartCommit, Result, StockAdjust, StockDelta, Store, StoreError};
use domain::user::User;
use serde::de::DeserializeOwned;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};

/// PostgreSQL-backed store implementation.
///
/// Documents are stored as JSONB; every composite operation runs in one
/// SQL transaction, and stock reads take a row lock (`FOR UPDATE`) so
/// concurrent adjustments to the same variant serialize at the database.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

/// Outcome of applying one stock delta inside a transaction.
enum DeltaOutcome {
    Applied { level: u32 },
    Insufficient { available: u32 },
    NotFound,
    /// A releasing delta against a vanished variant, skipped by policy.
    Skipped,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_doc<T: DeserializeOwned>(row: PgRow) -> Result<T> {
        let doc: serde_json::Value = row.try_get("doc").map_err(StoreError::backend)?;
        Ok(serde_json::from_value(doc)?)
    }

    async fn fetch_docs<T: DeserializeOwned>(&self, query: &str) -> Result<Vec<T>> {
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        rows.into_iter().map(Self::row_doc).collect()
    }

    /// Locks a product row and applies one stock delta with a floor of
    /// zero. The caller's transaction scopes the lock.
    async fn apply_delta(
        conn: &mut PgConnection,
        delta: &StockDelta,
        skip_missing_releases: bool,
    ) -> Result<DeltaOutcome> {
        let row = sqlx::query("SELECT doc FROM products WHERE id = $1 FOR UPDATE")
            .bind(delta.product_id.as_uuid())
            .fetch_optional(&mut *conn)
            .await
            .map_err(StoreError::backend)?;

        let missing = |is_release: bool| {
            if is_release && skip_missing_releases {
                DeltaOutcome::Skipped
            } else {
                DeltaOutcome::NotFound
            }
        };

        let Some(row) = row else {
            return Ok(missing(delta.delta >= 0));
        };
        let mut product: Product = Self::row_doc(row)?;

        let Some(variant) = product.variant_mut(&delta.variant) else {
            return Ok(missing(delta.delta >= 0));
        };

        let next = variant.stock as i64 + delta.delta;
        if next < 0 {
            return Ok(DeltaOutcome::Insufficient {
                available: variant.stock,
            });
        }
        variant.stock = next as u32;
        let level = variant.stock;

        sqlx::query("UPDATE products SET doc = $2 WHERE id = $1")
            .bind(delta.product_id.as_uuid())
            .bind(serde_json::to_value(&product)?)
            .execute(&mut *conn)
            .await
            .map_err(StoreError::backend)?;

        Ok(DeltaOutcome::Applied { level })
    }

    async fn upsert_cart(conn: &mut PgConnection, cart: &Cart) -> Result<()> {
        if cart.lines.is_empty() {
            sqlx::query("DELETE FROM carts WHERE user_id = $1")
                .bind(cart.user.as_uuid())
                .execute(&mut *conn)
                .await
                .map_err(StoreError::backend)?;
        } else {
            sqlx::query(
                r#"
                INSERT INTO carts (user_id, doc) VALUES ($1, $2)
                ON CONFLICT (user_id) DO UPDATE SET doc = EXCLUDED.doc
                "#,
            )
            .bind(cart.user.as_uuid())
            .bind(serde_json::to_value(cart)?)
            .execute(&mut *conn)
            .await
            .map_err(StoreError::backend)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT doc FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        row.map(Self::row_doc).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        self.fetch_docs("SELECT doc FROM products ORDER BY doc->>'title'")
            .await
    }

    async fn put_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, doc) VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(serde_json::to_value(product)?)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn adjust_stock(
        &self,
        id: ProductId,
        variant: &VariantKey,
        delta: i64,
    ) -> Result<StockAdjust> {
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        let delta = StockDelta {
            product_id: id,
            variant: variant.clone(),
            delta,
        };
        let outcome = match Self::apply_delta(&mut tx, &delta, false).await? {
            DeltaOutcome::Applied { level } => StockAdjust::Adjusted { level },
            DeltaOutcome::Insufficient { available } => StockAdjust::Insufficient { available },
            DeltaOutcome::NotFound | DeltaOutcome::Skipped => StockAdjust::NotFound,
        };

        if matches!(outcome, StockAdjust::Adjusted { .. }) {
            tx.commit().await.map_err(StoreError::backend)?;
        }
        Ok(outcome)
    }

    async fn get_cart(&self, user: UserId) -> Result<Option<Cart>> {
        let row = sqlx::query("SELECT doc FROM carts WHERE user_id = $1")
            .bind(user.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        row.map(Self::row_doc).transpose()
    }

    async fn commit_cart(&self, cart: &Cart, deltas: &[StockDelta]) -> Result<CartCommit> {
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        for delta in deltas {
            match Self::apply_delta(&mut tx, delta, true).await? {
                DeltaOutcome::Applied { .. } | DeltaOutcome::Skipped => {}
                DeltaOutcome::Insufficient { available } => {
                    // Dropping the transaction rolls back prior deltas.
                    return Ok(CartCommit::Insufficient {
                        product_id: delta.product_id,
                        variant: delta.variant.clone(),
                        available,
                    });
                }
                DeltaOutcome::NotFound => {
                    return Ok(CartCommit::NotFound {
                        product_id: delta.product_id,
                        variant: delta.variant.clone(),
                    });
                }
            }
        }

        Self::upsert_cart(&mut tx, cart).await?;
        tx.commit().await.map_err(StoreError::backend)?;
        Ok(CartCommit::Committed)
    }

    async fn insert_order_clearing_cart(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, rider_id, status, revision, created_at, doc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.customer.as_uuid())
        .bind(order.assigned_rider_id().map(|r| r.as_uuid()))
        .bind(order.status.as_str())
        .bind(order.revision)
        .bind(order.created_at)
        .bind(serde_json::to_value(order)?)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::backend)?;

        sqlx::query("DELETE FROM carts WHERE user_id = $1")
            .bind(order.customer.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(StoreError::backend)?;

        tx.commit().await.map_err(StoreError::backend)?;
        Ok(())
    }

    async fn update_order(
        &self,
        order: &Order,
        expected_revision: i64,
        releases: &[StockDelta],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        for delta in releases {
            match Self::apply_delta(&mut tx, delta, true).await? {
                DeltaOutcome::Applied { .. } | DeltaOutcome::Skipped => {}
                DeltaOutcome::Insufficient { .. } | DeltaOutcome::NotFound => {
                    return Err(StoreError::backend(std::io::Error::other(
                        "order update carried a non-releasing stock delta",
                    )));
                }
            }
        }

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET doc = $2, rider_id = $3, status = $4, revision = $5
            WHERE id = $1 AND revision = $6
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(serde_json::to_value(order)?)
        .bind(order.assigned_rider_id().map(|r| r.as_uuid()))
        .bind(order.status.as_str())
        .bind(order.revision)
        .bind(expected_revision)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::backend)?;

        if result.rows_affected() == 0 {
            let actual: Option<i64> =
                sqlx::query_scalar("SELECT revision FROM orders WHERE id = $1")
                    .bind(order.id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(StoreError::backend)?;

            return Err(match actual {
                Some(actual) => StoreError::RevisionConflict {
                    order_id: order.id,
                    expected: expected_revision,
                    actual,
                },
                None => StoreError::OrderNotFound(order.id),
            });
        }

        tx.commit().await.map_err(StoreError::backend)?;
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT doc FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        row.map(Self::row_doc).transpose()
    }

    async fn list_orders_for_customer(&self, customer: UserId) -> Result<Vec<Order>> {
        let rows =
            sqlx::query("SELECT doc FROM orders WHERE customer_id = $1 ORDER BY created_at DESC")
                .bind(customer.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(StoreError::backend)?;
        rows.into_iter().map(Self::row_doc).collect()
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        self.fetch_docs("SELECT doc FROM orders ORDER BY created_at DESC")
            .await
    }

    async fn list_orders_for_rider(&self, rider: UserId) -> Result<Vec<Order>> {
        let rows =
            sqlx::query("SELECT doc FROM orders WHERE rider_id = $1 ORDER BY created_at DESC")
                .bind(rider.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(StoreError::backend)?;
        rows.into_iter().map(Self::row_doc).collect()
    }

    async fn count_orders_for_rider(&self, rider: UserId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE rider_id = $1")
            .bind(rider.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(count as u64)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT doc FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        row.map(Self::row_doc).transpose()
    }

    async fn get_user_by_subject(&self, subject_id: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT doc FROM users WHERE subject_id = $1")
            .bind(subject_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        row.map(Self::row_doc).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT doc FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        row.map(Self::row_doc).transpose()
    }

    async fn put_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, subject_id, email, role, doc)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET subject_id = EXCLUDED.subject_id,
                email = EXCLUDED.email,
                role = EXCLUDED.role,
                doc = EXCLUDED.doc
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.subject_id)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(serde_json::to_value(user)?)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT doc FROM users WHERE role = $1")
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        rows.into_iter().map(Self::row_doc).collect()
    }
}
