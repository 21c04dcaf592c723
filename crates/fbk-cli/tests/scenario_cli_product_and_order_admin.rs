use assert_cmd::prelude::*;
use predicates::prelude::*;

/// End-to-end admin session through the binary: migrate, add a product,
/// list/show it, move an order through a status, remove the product.
///
/// DB-backed and skipped if FRESHBULK_DATABASE_URL is not set.
#[tokio::test]
async fn cli_admin_roundtrip() -> anyhow::Result<()> {
    let url = match std::env::var(fbk_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: FRESHBULK_DATABASE_URL not set");
            return Ok(());
        }
    };

    let mut cmd = assert_cmd::Command::cargo_bin("fbk")?;
    cmd.env(fbk_db::ENV_DB_URL, &url).args(["db", "migrate"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"migrations_applied\": true"));

    // Unique name per run so the test tolerates a shared database.
    let name = fbk_testkit::unique("cli_admin_product");

    let mut cmd = assert_cmd::Command::cargo_bin("fbk")?;
    cmd.env(fbk_db::ENV_DB_URL, &url).args([
        "product",
        "add",
        "--name",
        &name,
        "--price-cents",
        "1299",
        "--description",
        "Bulk crate",
    ]);
    let out = cmd.assert().success();
    let stdout = String::from_utf8(out.get_output().stdout.clone())?;
    let created: serde_json::Value = serde_json::from_str(&stdout)?;
    let product_id = created["id"].as_i64().unwrap();
    assert_eq!(created["price_cents"], 1299);

    let mut cmd = assert_cmd::Command::cargo_bin("fbk")?;
    cmd.env(fbk_db::ENV_DB_URL, &url).args(["product", "list"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(&name));

    let mut cmd = assert_cmd::Command::cargo_bin("fbk")?;
    cmd.env(fbk_db::ENV_DB_URL, &url)
        .args(["product", "show", "--id", &product_id.to_string()]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Bulk crate"));

    // Place an order directly through the storage layer, then drive its
    // status through the binary.
    let pool = fbk_db::connect(&url, 2).await?;
    let order_id =
        fbk_db::create_order(&pool, &fbk_testkit::sample_new_order(&[product_id])).await?;

    let mut cmd = assert_cmd::Command::cargo_bin("fbk")?;
    cmd.env(fbk_db::ENV_DB_URL, &url).args([
        "order",
        "set-status",
        "--id",
        &order_id.to_string(),
        "--status",
        "In Progress",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"In Progress\""));

    let mut cmd = assert_cmd::Command::cargo_bin("fbk")?;
    cmd.env(fbk_db::ENV_DB_URL, &url)
        .args(["order", "show", "--id", &order_id.to_string()]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"In Progress\""))
        .stdout(predicate::str::contains(&name));

    let mut cmd = assert_cmd::Command::cargo_bin("fbk")?;
    cmd.env(fbk_db::ENV_DB_URL, &url)
        .args(["product", "rm", "--id", &product_id.to_string()]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"deleted\": true"));

    // Second removal is a clean error, not a silent success.
    let mut cmd = assert_cmd::Command::cargo_bin("fbk")?;
    cmd.env(fbk_db::ENV_DB_URL, &url)
        .args(["product", "rm", "--id", &product_id.to_string()]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no product with id"));

    Ok(())
}
