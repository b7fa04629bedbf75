use clap::Subcommand;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::cli::client::ApiClient;
use crate::cli::utils::{output_record, output_success, output_table};
use crate::cli::OutputFormat;
use crate::types::{ApprovalStatus, Collection};

#[derive(Subcommand)]
pub enum AdminCommands {
    #[command(about = "Count records per status in every collection")]
    Stats,

    #[command(about = "List a collection (vendors, partners, products, applications)")]
    List {
        collection: Collection,
        #[arg(long, help = "pending, approved or rejected")]
        status: Option<ApprovalStatus>,
        #[arg(long, help = "Case-insensitive search on the collection's name column")]
        search: Option<String>,
        #[arg(long, help = "Sort, e.g. \"created_at desc\"")]
        order: Option<String>,
        #[arg(long)]
        limit: Option<i32>,
        #[arg(long)]
        offset: Option<i32>,
    },

    #[command(about = "Show one record")]
    Show { collection: Collection, id: Uuid },

    #[command(about = "Approve a record")]
    Approve {
        collection: Collection,
        id: Uuid,
        #[arg(long, help = "Review note")]
        note: Option<String>,
    },

    #[command(about = "Reject a record")]
    Reject {
        collection: Collection,
        id: Uuid,
        #[arg(long, help = "Review note shown to the submitter")]
        note: Option<String>,
    },
}

/// Columns shown in text listings
fn list_columns(collection: Collection) -> &'static [&'static str] {
    match collection {
        Collection::Vendors => &["id", "company_name", "status", "created_at"],
        Collection::Partners => &["id", "display_name", "channels", "status", "created_at"],
        Collection::Products => &["id", "name", "category", "status", "created_at"],
        Collection::Applications => &["id", "partner_id", "product_id", "status", "created_at"],
    }
}

pub async fn handle(cmd: AdminCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = ApiClient::from_env()?;

    match cmd {
        AdminCommands::Stats => {
            let stats = client.get("/api/admin/stats").await?;
            let rows: Vec<Value> = Collection::ALL
                .iter()
                .map(|c| {
                    let counts = &stats[c.as_str()];
                    json!({
                        "collection": c.as_str(),
                        "pending": counts["pending"],
                        "approved": counts["approved"],
                        "rejected": counts["rejected"],
                        "total": counts["total"],
                    })
                })
                .collect();
            output_table(&output_format, &rows, &["collection", "pending", "approved", "rejected", "total"])
        }
        AdminCommands::List { collection, status, search, order, limit, offset } => {
            let mut query: Vec<(&str, String)> = Vec::new();
            if let Some(status) = status {
                query.push(("status", status.to_string()));
            }
            if let Some(search) = search {
                query.push(("search", search));
            }
            if let Some(order) = order {
                query.push(("order", order));
            }
            if let Some(limit) = limit {
                query.push(("limit", limit.to_string()));
            }
            if let Some(offset) = offset {
                query.push(("offset", offset.to_string()));
            }

            let page = client
                .get_query(&format!("/api/admin/{}", collection), &query)
                .await?;
            let items = page["items"].as_array().cloned().unwrap_or_default();
            output_table(&output_format, &items, list_columns(collection))?;
            if let OutputFormat::Text = output_format {
                println!("{} of {} shown", items.len(), page["total"]);
            }
            Ok(())
        }
        AdminCommands::Show { collection, id } => {
            let record = client.get(&format!("/api/admin/{}/{}", collection, id)).await?;
            output_record(&output_format, &record)
        }
        AdminCommands::Approve { collection, id, note } => {
            let record = client
                .post(&format!("/api/admin/{}/{}/approve", collection, id), &json!({ "note": note }))
                .await?;
            output_success(&output_format, &format!("Approved {} {}", collection, id), Some(record))
        }
        AdminCommands::Reject { collection, id, note } => {
            let record = client
                .post(&format!("/api/admin/{}/{}/reject", collection, id), &json!({ "note": note }))
                .await?;
            output_success(&output_format, &format!("Rejected {} {}", collection, id), Some(record))
        }
    }
}
