mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn health_reports_degraded_without_database() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(server.url("/health")).await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["status"], "degraded");
    Ok(())
}

#[tokio::test]
async fn root_lists_the_route_tiers() -> Result<()> {
    let server = common::ensure_server().await?;

    let body: Value = reqwest::get(server.url("/")).await?.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Rezollo API");
    assert!(body["data"]["endpoints"]["admin"].is_string());
    Ok(())
}

#[tokio::test]
async fn catalog_needs_the_database() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(server.url("/catalog/products")).await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = res.json().await?;
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
    Ok(())
}

#[tokio::test]
async fn calculator_works_without_database() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::Client::new()
        .post(server.url("/calculator"))
        .json(&serde_json::json!({
            "deals_per_month": 5,
            "average_deal_value": 1000,
            "commission_rate": 25,
            "monthly_fee": 99
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    let profit: f64 = body["data"]["monthly_profit"].as_str().unwrap_or_default().parse()?;
    assert_eq!(profit, 1151.0);
    Ok(())
}

#[tokio::test]
async fn missing_uploads_are_404() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(server.url("/storage/product-images/nope.png")).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
