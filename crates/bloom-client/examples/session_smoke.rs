//! Smoke test against a deployed bucket and user pool.
//!
//! Loads the saved client config, signs in with a password, waits for the
//! first goal and recipe snapshots and prints them. Writes nothing.
//!
//! Usage:
//!   BLOOM_EMAIL=me@example.com \
//!   BLOOM_PASSWORD=... \
//!   cargo run -p bloom-client --example session_smoke

use std::time::Duration;

use bloom_auth::provider::Credentials;
use bloom_client::client::BloomClient;
use bloom_client::{aws, config, telemetry};
use bloom_core::filter::FilterCriteria;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    telemetry::init(false)?;

    let email = std::env::var("BLOOM_EMAIL").map_err(|_| eyre::eyre!("set BLOOM_EMAIL env var"))?;
    let password =
        std::env::var("BLOOM_PASSWORD").map_err(|_| eyre::eyre!("set BLOOM_PASSWORD env var"))?;

    let config = config::load_config()?;
    println!("Region: {}", config.region);
    println!("Bucket: {}", config.bucket);
    println!();

    let backend = aws::connect(&config).await;
    let client = BloomClient::new(backend.store.clone(), backend.sessions.subscribe());

    let session = backend
        .sessions
        .sign_in(&Credentials::Password { email, password })
        .await?;
    println!("Signed in as {}", session.owner);

    let mut goals = client.goals();
    tokio::time::timeout(
        Duration::from_secs(30),
        goals.wait_for(|view| view.owner() == Some(&session.owner) && view.is_loaded()),
    )
    .await
    .map_err(|_| eyre::eyre!("timed out waiting for goals"))??;

    match client.active_goal() {
        Some(goal) => println!(
            "Active goal: {} kcal, {}g protein, {}g fat, {}g carbs since {}",
            goal.calories, goal.proteins, goal.fats, goal.carbs, goal.from
        ),
        None => println!("No active goal"),
    }

    let mut recipes = client.recipes();
    tokio::time::timeout(
        Duration::from_secs(30),
        recipes.wait_for(|view| view.owner() == Some(&session.owner) && view.is_loaded()),
    )
    .await
    .map_err(|_| eyre::eyre!("timed out waiting for recipes"))??;

    let visible = client.visible_recipes(&FilterCriteria::default());
    println!("{} recipes", visible.len());
    for recipe in &visible {
        let category = recipe.category.map(|c| c.label()).unwrap_or("-");
        println!("  {:<30} {}", recipe.name, category);
    }

    drop(client);
    backend.sessions.sign_out().await;
    Ok(())
}
