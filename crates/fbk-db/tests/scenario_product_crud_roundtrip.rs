//! Product CRUD against a real database.
//!
//! DB-backed test. Skips if FRESHBULK_DATABASE_URL is not set.

#[tokio::test]
async fn product_insert_update_delete_roundtrip() -> anyhow::Result<()> {
    let url = match std::env::var(fbk_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: FRESHBULK_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = fbk_db::connect(&url, 2).await?;
    fbk_db::migrate(&pool).await?;

    let mut new_product = fbk_testkit::sample_new_product("carrots");
    new_product.image_url = Some("https://example.com/carrots.jpg".to_string());

    let created = fbk_db::insert_product(&pool, &new_product).await?;
    assert_eq!(created.name, new_product.name);
    assert_eq!(created.price_cents, 499);
    assert_eq!(
        created.image_url.as_deref(),
        Some("https://example.com/carrots.jpg")
    );

    let fetched = fbk_db::fetch_product(&pool, created.id)
        .await?
        .expect("freshly inserted product is fetchable");
    assert_eq!(fetched.id, created.id);

    let listed = fbk_db::list_products(&pool).await?;
    assert!(
        listed.iter().any(|p| p.id == created.id),
        "created product appears in the listing"
    );

    // Full-row update.
    let updated = fbk_db::update_product(
        &pool,
        created.id,
        &fbk_schemas::NewProduct {
            name: created.name.clone(),
            price_cents: 599,
            description: None,
            image_url: None,
        },
    )
    .await?
    .expect("update of existing product returns the row");
    assert_eq!(updated.price_cents, 599);
    assert_eq!(updated.description, None, "update overwrites all fields");

    // Delete, then everything about the id goes 404-shaped.
    assert!(fbk_db::delete_product(&pool, created.id).await?);
    assert!(!fbk_db::delete_product(&pool, created.id).await?);
    assert!(fbk_db::fetch_product(&pool, created.id).await?.is_none());
    assert!(fbk_db::update_product(&pool, created.id, &new_product)
        .await?
        .is_none());

    Ok(())
}

#[tokio::test]
async fn seeding_is_idempotent() -> anyhow::Result<()> {
    let url = match std::env::var(fbk_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: FRESHBULK_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = fbk_db::connect(&url, 2).await?;
    fbk_db::migrate(&pool).await?;

    // First call may or may not seed depending on what the shared DB holds;
    // after it the table is definitely non-empty, so a second call must be
    // a no-op.
    let first = fbk_db::seed_demo_products(&pool).await?;
    if first > 0 {
        assert_eq!(first, 4, "seed inserts the whole sample catalog");
    }
    assert!(fbk_db::count_products(&pool).await? > 0);

    let second = fbk_db::seed_demo_products(&pool).await?;
    assert_eq!(second, 0, "seeding a non-empty table inserts nothing");

    Ok(())
}
