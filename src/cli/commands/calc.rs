use clap::Args;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::cli::client::ApiClient;
use crate::cli::utils::{output_record, output_table};
use crate::cli::OutputFormat;
use crate::services::calculator::{break_even_deals, estimate, CalculatorInput};

#[derive(Args)]
pub struct CalcArgs {
    #[arg(long, help = "Deals closed per month")]
    pub deals: Decimal,

    #[arg(long, help = "Average deal value")]
    pub value: Decimal,

    #[arg(long, help = "Commission rate in percent (ignored with --product)")]
    pub rate: Option<Decimal>,

    #[arg(long, default_value = "0", help = "Monthly partner fee (ignored with --product)")]
    pub fee: Decimal,

    #[arg(long, help = "Compare every pricing tier of a catalog product instead")]
    pub product: Option<Uuid>,
}

pub async fn handle(args: CalcArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    if let Some(product_id) = args.product {
        let comparison = ApiClient::from_env()?
            .get_query(
                &format!("/catalog/products/{}/calculator", product_id),
                &[
                    ("deals_per_month", args.deals.to_string()),
                    ("average_deal_value", args.value.to_string()),
                ],
            )
            .await?;

        if let OutputFormat::Json = output_format {
            return output_record(&output_format, &comparison);
        }
        let rows: Vec<serde_json::Value> = comparison["tiers"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|t| {
                json!({
                    "tier": t["name"],
                    "monthly_profit": t["estimate"]["monthly_profit"],
                    "annual_profit": t["estimate"]["annual_profit"],
                    "break_even_deals": t["break_even_deals"],
                })
            })
            .collect();
        output_table(&output_format, &rows, &["tier", "monthly_profit", "annual_profit", "break_even_deals"])?;
        if let Some(best) = comparison["best"].as_u64() {
            println!("Best tier: {}", comparison["tiers"][best as usize]["name"].as_str().unwrap_or("-"));
        }
        return Ok(());
    }

    let rate = args
        .rate
        .ok_or_else(|| anyhow::anyhow!("--rate is required unless --product is given"))?;
    let result = estimate(CalculatorInput {
        deals_per_month: args.deals,
        average_deal_value: args.value,
        commission_rate: rate,
        monthly_fee: args.fee,
    })?;

    let mut record = serde_json::to_value(result)?;
    record["break_even_deals"] = json!(break_even_deals(args.value, rate, args.fee)?);
    output_record(&output_format, &record)
}
