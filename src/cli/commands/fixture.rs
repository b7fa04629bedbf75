use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use futures::future::try_join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::cli::client::{is_conflict, ApiClient};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum FixtureCommands {
    #[command(about = "Create the accounts, profiles and products described in a YAML file")]
    Load {
        #[arg(help = "Fixture file (YAML)")]
        file: PathBuf,
        #[arg(long, help = "Approve everything created, using the current admin session")]
        approve: bool,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    /// Used for accounts that do not set their own password
    pub password: Option<String>,
    #[serde(default)]
    pub vendors: Vec<VendorFixture>,
    #[serde(default)]
    pub partners: Vec<PartnerFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VendorFixture {
    pub email: String,
    pub full_name: String,
    pub password: Option<String>,
    pub profile: VendorProfileFixture,
    #[serde(default)]
    pub products: Vec<ProductFixture>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorProfileFixture {
    pub company_name: String,
    pub website: Option<String>,
    pub description: Option<String>,
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductFixture {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub website_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing)]
    pub tiers: Vec<TierFixture>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierFixture {
    pub name: String,
    pub monthly_fee: Decimal,
    pub commission_rate: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartnerFixture {
    pub email: String,
    pub full_name: String,
    pub password: Option<String>,
    pub profile: PartnerProfileFixture,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerProfileFixture {
    pub display_name: String,
    pub website: Option<String>,
    pub bio: Option<String>,
    pub audience_size: Option<i32>,
    #[serde(default)]
    pub channels: Vec<String>,
}

/// Ids of everything a load created, keyed by collection
#[derive(Debug, Default, Serialize)]
pub struct LoadReport {
    pub vendors: Vec<String>,
    pub partners: Vec<String>,
    pub products: Vec<String>,
    pub skipped: Vec<String>,
}

pub fn parse_fixture(content: &str) -> anyhow::Result<Fixture> {
    let fixture: Fixture = serde_yaml::from_str(content)?;
    if fixture.password.is_none() {
        let missing = fixture
            .vendors
            .iter()
            .filter(|v| v.password.is_none())
            .map(|v| &v.email)
            .chain(fixture.partners.iter().filter(|p| p.password.is_none()).map(|p| &p.email))
            .next();
        if let Some(email) = missing {
            anyhow::bail!("account {} has no password and the fixture sets no default", email);
        }
    }
    Ok(fixture)
}

pub async fn handle(cmd: FixtureCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        FixtureCommands::Load { file, approve } => {
            let content = fs::read_to_string(&file).with_context(|| format!("cannot read {}", file.display()))?;
            let fixture = parse_fixture(&content)?;
            let admin = ApiClient::from_env()?;
            let anonymous = ApiClient::new(admin.base_url(), None)?;

            let report = load(&anonymous, &fixture).await?;
            if approve {
                approve_all(&admin, &report).await?;
            }

            output_success(
                &output_format,
                &format!(
                    "Loaded {} vendors, {} partners, {} products ({} accounts skipped)",
                    report.vendors.len(),
                    report.partners.len(),
                    report.products.len(),
                    report.skipped.len()
                ),
                Some(serde_json::to_value(&report)?),
            )
        }
    }
}

async fn load(client: &ApiClient, fixture: &Fixture) -> anyhow::Result<LoadReport> {
    let default_password = fixture.password.clone().unwrap_or_default();

    let vendors = try_join_all(
        fixture
            .vendors
            .iter()
            .map(|v| load_vendor(client, v, v.password.as_deref().unwrap_or(&default_password))),
    )
    .await?;
    let partners = try_join_all(
        fixture
            .partners
            .iter()
            .map(|p| load_partner(client, p, p.password.as_deref().unwrap_or(&default_password))),
    )
    .await?;

    let mut report = LoadReport::default();
    for (email, created) in vendors {
        match created {
            Some((vendor_id, product_ids)) => {
                report.vendors.push(vendor_id);
                report.products.extend(product_ids);
            }
            None => report.skipped.push(email),
        }
    }
    for (email, created) in partners {
        match created {
            Some(partner_id) => report.partners.push(partner_id),
            None => report.skipped.push(email),
        }
    }
    Ok(report)
}

/// Sign up; `None` when the email is already registered.
async fn signup(client: &ApiClient, email: &str, full_name: &str, role: &str, password: &str) -> anyhow::Result<Option<ApiClient>> {
    let result = client
        .post(
            "/auth/signup",
            &json!({ "email": email, "password": password, "full_name": full_name, "role": role }),
        )
        .await;
    match result {
        Ok(data) => {
            let token = data["token"].as_str().context("signup returned no token")?;
            Ok(Some(client.with_token(token)))
        }
        Err(e) if is_conflict(&e) => {
            tracing::info!("{} already registered, skipping", email);
            Ok(None)
        }
        Err(e) => Err(e.context(format!("signup of {} failed", email))),
    }
}

async fn load_vendor(
    client: &ApiClient,
    vendor: &VendorFixture,
    password: &str,
) -> anyhow::Result<(String, Option<(String, Vec<String>)>)> {
    let Some(session) = signup(client, &vendor.email, &vendor.full_name, "vendor", password).await? else {
        return Ok((vendor.email.clone(), None));
    };

    let profile = session.post("/api/vendor/profile", &vendor.profile).await?;
    let mut product_ids = Vec::with_capacity(vendor.products.len());
    for product in &vendor.products {
        let created = session.post("/api/vendor/products", product).await?;
        let product_id = id_of(&created)?;
        for tier in &product.tiers {
            session
                .post(&format!("/api/vendor/products/{}/tiers", product_id), tier)
                .await?;
        }
        product_ids.push(product_id);
    }

    Ok((vendor.email.clone(), Some((id_of(&profile)?, product_ids))))
}

async fn load_partner(
    client: &ApiClient,
    partner: &PartnerFixture,
    password: &str,
) -> anyhow::Result<(String, Option<String>)> {
    let Some(session) = signup(client, &partner.email, &partner.full_name, "partner", password).await? else {
        return Ok((partner.email.clone(), None));
    };
    let profile = session.post("/api/partner/profile", &partner.profile).await?;
    Ok((partner.email.clone(), Some(id_of(&profile)?)))
}

async fn approve_all(admin: &ApiClient, report: &LoadReport) -> anyhow::Result<()> {
    let targets = report
        .vendors
        .iter()
        .map(|id| ("vendors", id))
        .chain(report.partners.iter().map(|id| ("partners", id)))
        .chain(report.products.iter().map(|id| ("products", id)));

    try_join_all(targets.map(|(collection, id)| async move {
        admin
            .post(&format!("/api/admin/{}/{}/approve", collection, id), &json!({ "note": "fixture" }))
            .await
    }))
    .await?;
    Ok(())
}

fn id_of(record: &Value) -> anyhow::Result<String> {
    record["id"]
        .as_str()
        .map(str::to_string)
        .context("response carried no id")
}
