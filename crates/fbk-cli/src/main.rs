use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fbk_schemas::{NewProduct, Order, OrderStatus};
use serde_json::json;

#[derive(Parser)]
#[command(name = "fbk")]
#[command(about = "FreshBulk storefront CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Catalog administration
    Product {
        #[command(subcommand)]
        cmd: ProductCmd,
    },

    /// Order administration
    Order {
        #[command(subcommand)]
        cmd: OrderCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base first, overlays after)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    /// Connectivity + schema presence at a glance
    Status,

    /// Round-trip `select now()` and print the server clock
    Ping,

    /// Report which storefront tables exist and which are missing
    Tables,

    /// Apply SQL migrations
    Migrate,

    /// Insert the sample catalog into an empty products table
    Seed,
}

#[derive(Subcommand)]
enum ProductCmd {
    /// List the catalog (name order)
    List,

    /// Print one product
    Show {
        #[arg(long)]
        id: i64,
    },

    /// Add a product to the catalog
    Add {
        #[arg(long)]
        name: String,

        /// Price in integer cents (e.g. 299 for $2.99)
        #[arg(long)]
        price_cents: i64,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        image_url: Option<String>,
    },

    /// Replace a product's fields
    Update {
        #[arg(long)]
        id: i64,

        #[arg(long)]
        name: String,

        /// Price in integer cents
        #[arg(long)]
        price_cents: i64,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        image_url: Option<String>,
    },

    /// Remove a product (cascades to its order lines)
    Rm {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Subcommand)]
enum OrderCmd {
    /// List orders, newest first (header rows only)
    List,

    /// Print one order with its line items
    Show {
        #[arg(long)]
        id: i64,
    },

    /// Move an order to a new status (Pending | In Progress | Delivered)
    SetStatus {
        #[arg(long)]
        id: i64,

        #[arg(long)]
        status: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience).
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => match cmd {
            DbCmd::Status => {
                let pool = fbk_db::connect_from_env().await?;
                let s = fbk_db::status(&pool).await?;
                print_json(&json!({
                    "db_ok": s.ok,
                    "has_products_table": s.has_products_table,
                }))?;
            }
            DbCmd::Ping => {
                let pool = fbk_db::connect_from_env().await?;
                let now = fbk_db::ping(&pool).await?;
                print_json(&json!({ "ok": true, "now_utc": now.to_rfc3339() }))?;
            }
            DbCmd::Tables => {
                let pool = fbk_db::connect_from_env().await?;
                let report = fbk_db::check_tables(&pool).await?;
                print_json(&json!({
                    "existing": report.existing,
                    "missing": report.missing,
                    "initialized": report.is_initialized(),
                }))?;
            }
            DbCmd::Migrate => {
                let pool = fbk_db::connect_from_env().await?;
                fbk_db::migrate(&pool).await?;
                print_json(&json!({ "migrations_applied": true }))?;
            }
            DbCmd::Seed => {
                let pool = fbk_db::connect_from_env().await?;
                let inserted = fbk_db::seed_demo_products(&pool).await?;
                let total = fbk_db::count_products(&pool).await?;
                print_json(&json!({ "inserted": inserted, "product_count": total }))?;
            }
        },

        Commands::Product { cmd } => match cmd {
            ProductCmd::List => {
                let pool = fbk_db::connect_from_env().await?;
                let products = fbk_db::list_products(&pool).await?;
                print_json(&products)?;
            }
            ProductCmd::Show { id } => {
                let pool = fbk_db::connect_from_env().await?;
                let p = fbk_db::fetch_product(&pool, id)
                    .await?
                    .with_context(|| format!("no product with id {id}"))?;
                print_json(&p)?;
            }
            ProductCmd::Add {
                name,
                price_cents,
                description,
                image_url,
            } => {
                let new = validated_product(name, price_cents, description, image_url)?;
                let pool = fbk_db::connect_from_env().await?;
                let p = fbk_db::insert_product(&pool, &new).await?;
                print_json(&p)?;
            }
            ProductCmd::Update {
                id,
                name,
                price_cents,
                description,
                image_url,
            } => {
                let new = validated_product(name, price_cents, description, image_url)?;
                let pool = fbk_db::connect_from_env().await?;
                let p = fbk_db::update_product(&pool, id, &new)
                    .await?
                    .with_context(|| format!("no product with id {id}"))?;
                print_json(&p)?;
            }
            ProductCmd::Rm { id } => {
                let pool = fbk_db::connect_from_env().await?;
                let deleted = fbk_db::delete_product(&pool, id).await?;
                if !deleted {
                    bail!("no product with id {id}");
                }
                print_json(&json!({ "deleted": true, "id": id }))?;
            }
        },

        Commands::Order { cmd } => match cmd {
            OrderCmd::List => {
                let pool = fbk_db::connect_from_env().await?;
                let orders = fbk_db::list_orders(&pool).await?;
                print_json(&orders)?;
            }
            OrderCmd::Show { id } => {
                let pool = fbk_db::connect_from_env().await?;
                let order = fetch_order_with_items(&pool, id).await?;
                print_json(&order)?;
            }
            OrderCmd::SetStatus { id, status } => {
                // Validate the status string before touching the database, so
                // a typo fails fast even when the DB is unreachable.
                let parsed = match OrderStatus::parse(&status) {
                    Some(s) => s,
                    None => bail!(
                        "invalid status {status:?}. must be one of: Pending, In Progress, Delivered"
                    ),
                };

                let pool = fbk_db::connect_from_env().await?;
                if fbk_db::update_order_status(&pool, id, parsed).await?.is_none() {
                    bail!("no order with id {id}");
                }

                let order = fetch_order_with_items(&pool, id).await?;
                print_json(&order)?;
            }
        },

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = fbk_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(v: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}

/// Same field rules the daemon applies: non-blank name, positive price.
fn validated_product(
    name: String,
    price_cents: i64,
    description: Option<String>,
    image_url: Option<String>,
) -> Result<NewProduct> {
    let name = name.trim().to_string();
    if name.is_empty() {
        bail!("name must not be blank");
    }
    if price_cents <= 0 {
        bail!("price_cents must be a positive integer");
    }
    Ok(NewProduct {
        name,
        price_cents,
        description,
        image_url,
    })
}

async fn fetch_order_with_items(pool: &sqlx::PgPool, id: i64) -> Result<Order> {
    let mut order = fbk_db::fetch_order(pool, id)
        .await?
        .with_context(|| format!("no order with id {id}"))?;
    order.items = fbk_db::list_order_items(pool, id).await?;
    Ok(order)
}
