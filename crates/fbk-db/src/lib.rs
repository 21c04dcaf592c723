use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use fbk_schemas::{NewOrder, NewProduct, Order, OrderItem, OrderStatus, Product};

pub const ENV_DB_URL: &str = "FRESHBULK_DATABASE_URL";

/// The three tables the storefront needs. `check_tables` reports against
/// this list; `/v1/db/tables` surfaces the result.
pub const REQUIRED_TABLES: [&str; 3] = ["products", "orders", "order_items"];

/// Connect to Postgres using FRESHBULK_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL)
        .with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url, 10).await
}

pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='products'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus { ok, has_products_table: exists })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_products_table: bool,
}

/// Report which of the required tables exist.
pub async fn check_tables(pool: &PgPool) -> Result<TableReport> {
    let rows = sqlx::query(
        r#"
        select table_name
        from information_schema.tables
        where table_schema = 'public'
          and table_name = any($1)
        "#,
    )
    .bind(&REQUIRED_TABLES[..])
    .fetch_all(pool)
    .await
    .context("check_tables query failed")?;

    let mut existing: Vec<String> = Vec::new();
    for row in rows {
        existing.push(row.try_get("table_name")?);
    }

    let missing: Vec<String> = REQUIRED_TABLES
        .iter()
        .filter(|t| !existing.iter().any(|e| e == *t))
        .map(|t| t.to_string())
        .collect();

    Ok(TableReport { existing, missing })
}

#[derive(Debug, Clone)]
pub struct TableReport {
    pub existing: Vec<String>,
    pub missing: Vec<String>,
}

impl TableReport {
    pub fn is_initialized(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Round-trip connectivity probe; returns the server clock.
pub async fn ping(pool: &PgPool) -> Result<DateTime<Utc>> {
    let (now,): (DateTime<Utc>,) = sqlx::query_as::<_, (DateTime<Utc>,)>("select now()")
        .fetch_one(pool)
        .await
        .context("ping query failed")?;
    Ok(now)
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

const PRODUCT_COLUMNS: &str = "id, name, price_cents, description, image_url, created_at_utc";

fn product_from_row(row: &sqlx::postgres::PgRow) -> Result<Product> {
    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        price_cents: row.try_get("price_cents")?,
        description: row.try_get("description")?,
        image_url: row.try_get("image_url")?,
        created_at_utc: row.try_get("created_at_utc")?,
    })
}

/// Catalog listing, alphabetical — the order the storefront renders.
pub async fn list_products(pool: &PgPool) -> Result<Vec<Product>> {
    let rows = sqlx::query(&format!(
        "select {PRODUCT_COLUMNS} from products order by name asc"
    ))
    .fetch_all(pool)
    .await
    .context("list_products failed")?;

    rows.iter().map(product_from_row).collect()
}

pub async fn fetch_product(pool: &PgPool, id: i64) -> Result<Option<Product>> {
    let row = sqlx::query(&format!(
        "select {PRODUCT_COLUMNS} from products where id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("fetch_product failed")?;

    row.as_ref().map(product_from_row).transpose()
}

pub async fn insert_product(pool: &PgPool, p: &NewProduct) -> Result<Product> {
    let row = sqlx::query(&format!(
        r#"
        insert into products (name, price_cents, description, image_url)
        values ($1, $2, $3, $4)
        returning {PRODUCT_COLUMNS}
        "#
    ))
    .bind(&p.name)
    .bind(p.price_cents)
    .bind(&p.description)
    .bind(&p.image_url)
    .fetch_one(pool)
    .await
    .context("insert_product failed")?;

    product_from_row(&row)
}

/// Full-row update. Returns None when the id does not exist.
pub async fn update_product(pool: &PgPool, id: i64, p: &NewProduct) -> Result<Option<Product>> {
    let row = sqlx::query(&format!(
        r#"
        update products
        set name = $1, price_cents = $2, description = $3, image_url = $4
        where id = $5
        returning {PRODUCT_COLUMNS}
        "#
    ))
    .bind(&p.name)
    .bind(p.price_cents)
    .bind(&p.description)
    .bind(&p.image_url)
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("update_product failed")?;

    row.as_ref().map(product_from_row).transpose()
}

/// Returns true when a row was deleted, false when the id was absent.
/// order_items referencing the product cascade away with it.
pub async fn delete_product(pool: &PgPool, id: i64) -> Result<bool> {
    let row = sqlx::query("delete from products where id = $1 returning id")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("delete_product failed")?;

    Ok(row.is_some())
}

pub async fn count_products(pool: &PgPool) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as::<_, (i64,)>("select count(*)::bigint from products")
        .fetch_one(pool)
        .await
        .context("count_products failed")?;
    Ok(n)
}

/// Insert the sample catalog, but only into an empty products table.
/// Returns the number of rows inserted (0 when the table already has data).
pub async fn seed_demo_products(pool: &PgPool) -> Result<u64> {
    if count_products(pool).await? > 0 {
        return Ok(0);
    }

    let mut inserted = 0u64;
    for (name, price_cents, description, image_url) in fbk_schemas::demo::sample_rows() {
        sqlx::query(
            r#"
            insert into products (name, price_cents, description, image_url)
            values ($1, $2, $3, $4)
            "#,
        )
        .bind(name)
        .bind(price_cents)
        .bind(description)
        .bind(image_url)
        .execute(pool)
        .await
        .context("seed_demo_products insert failed")?;
        inserted += 1;
    }

    Ok(inserted)
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

const ORDER_COLUMNS: &str =
    "id, buyer_name, contact_info, delivery_address, status, created_at_utc";

fn order_from_row(row: &sqlx::postgres::PgRow) -> Result<Order> {
    let status_raw: String = row.try_get("status")?;
    let status = OrderStatus::parse(&status_raw)
        .ok_or_else(|| anyhow!("invalid order status in db: {status_raw}"))?;

    Ok(Order {
        id: row.try_get("id")?,
        buyer_name: row.try_get("buyer_name")?,
        contact_info: row.try_get("contact_info")?,
        delivery_address: row.try_get("delivery_address")?,
        status,
        created_at_utc: row.try_get("created_at_utc")?,
        items: Vec::new(),
    })
}

/// All orders, newest first. Items are NOT populated here; callers fetch
/// them per order so one bad order cannot fail the whole listing.
pub async fn list_orders(pool: &PgPool) -> Result<Vec<Order>> {
    let rows = sqlx::query(&format!(
        "select {ORDER_COLUMNS} from orders order by created_at_utc desc"
    ))
    .fetch_all(pool)
    .await
    .context("list_orders failed")?;

    rows.iter().map(order_from_row).collect()
}

pub async fn fetch_order(pool: &PgPool, id: i64) -> Result<Option<Order>> {
    let row = sqlx::query(&format!("select {ORDER_COLUMNS} from orders where id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetch_order failed")?;

    row.as_ref().map(order_from_row).transpose()
}

/// Items for one order, joined against products for display fields.
pub async fn list_order_items(pool: &PgPool, order_id: i64) -> Result<Vec<OrderItem>> {
    let rows = sqlx::query(
        r#"
        select
            oi.id,
            oi.product_id,
            oi.quantity,
            p.name as product_name,
            p.price_cents
        from order_items oi
        join products p on oi.product_id = p.id
        where oi.order_id = $1
        order by oi.id asc
        "#,
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
    .context("list_order_items failed")?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(OrderItem {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            product_name: row.try_get("product_name")?,
            price_cents: row.try_get("price_cents")?,
            quantity: row.try_get("quantity")?,
        });
    }
    Ok(items)
}

/// Insert an order plus all its items in one transaction.
///
/// Either the parent row and every item row commit together, or the
/// transaction rolls back and nothing persists — a failing item insert
/// (e.g. a product_id that does not exist) never leaves an orphan order.
pub async fn create_order(pool: &PgPool, order: &NewOrder) -> Result<i64> {
    if order.items.is_empty() {
        bail!("create_order requires at least one item");
    }

    let mut tx = pool.begin().await.context("create_order begin failed")?;

    let (order_id,): (i64,) = sqlx::query_as::<_, (i64,)>(
        r#"
        insert into orders (buyer_name, contact_info, delivery_address)
        values ($1, $2, $3)
        returning id
        "#,
    )
    .bind(&order.buyer_name)
    .bind(&order.contact_info)
    .bind(&order.delivery_address)
    .fetch_one(&mut *tx)
    .await
    .context("create_order insert order failed")?;

    for item in &order.items {
        sqlx::query(
            r#"
            insert into order_items (order_id, product_id, quantity)
            values ($1, $2, $3)
            "#,
        )
        .bind(order_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .execute(&mut *tx)
        .await
        .context("create_order insert item failed")?;
    }

    tx.commit().await.context("create_order commit failed")?;
    Ok(order_id)
}

/// Set an order's status. The enum parameter means an invalid string can
/// never reach SQL; the check constraint backstops direct writes.
/// Returns the order id when a row was updated, None when absent.
pub async fn update_order_status(
    pool: &PgPool,
    id: i64,
    status: OrderStatus,
) -> Result<Option<i64>> {
    let row = sqlx::query("update orders set status = $1 where id = $2 returning id")
        .bind(status.as_str())
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("update_order_status failed")?;

    match row {
        Some(r) => Ok(Some(r.try_get("id")?)),
        None => Ok(None),
    }
}
