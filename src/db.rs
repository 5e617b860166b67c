// =============================================================================
// Persistence layer — Mongo client/database handle + startup index creation
// =============================================================================
//
// Grounded on data-service/db.py::init_indexes and the teacher's startup
// sequence of binding shared state before spawning workers. Walks every
// collection in the storage layout (§6) and ensures its indexes exist,
// detecting and resolving the one recoverable failure mode — an
// index-options conflict on a collection that already carries a
// differently-configured index of the same name — by dropping and
// recreating it (§9). Any other index-creation error aborts startup.
// =============================================================================

use mongodb::bson::doc;
use mongodb::error::{CommandError, ErrorKind};
use mongodb::options::IndexOptions;
use mongodb::{Client, Database, IndexModel};
use tracing::{info, warn};

use crate::config::Config;

pub async fn connect(config: &Config) -> anyhow::Result<Database> {
    let client = Client::with_uri_str(&config.mongo_uri).await?;
    let db = client.database(&config.mongo_db_name);
    Ok(db)
}

/// Mongo's code for "an index with the same name already exists with
/// different options" — the one conflict we resolve automatically instead
/// of treating as fatal.
const INDEX_OPTIONS_CONFLICT_CODE: i32 = 85;

async fn ensure_index(db: &Database, collection: &str, index: IndexModel, index_name: &str) -> anyhow::Result<()> {
    let coll = db.collection::<mongodb::bson::Document>(collection);
    match coll.create_index(index.clone()).await {
        Ok(_) => {
            info!(collection = %collection, index = %index_name, "index ensured");
            Ok(())
        }
        Err(e) => {
            if is_index_options_conflict(&e) {
                warn!(collection = %collection, index = %index_name, "index-options conflict detected, dropping and recreating");
                coll.drop_index(index_name).await?;
                coll.create_index(index).await?;
                info!(collection = %collection, index = %index_name, "index recreated after conflict");
                Ok(())
            } else {
                Err(e.into())
            }
        }
    }
}

fn is_index_options_conflict(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Command(CommandError { code, .. }) if *code == INDEX_OPTIONS_CONFLICT_CODE
    )
}

/// Creates every index named in the storage layout (§6, §10.4). Called once
/// at startup; a non-conflict failure here is fatal, matching §4.1's "any
/// other store error is fatal to startup".
pub async fn ensure_indexes(db: &Database) -> anyhow::Result<()> {
    for (collection, ttl_secs) in [
        ("price_cache", 342_800u64),
        ("news_cache", 14_400),
        ("financials_cache", 342_800),
        ("industry_cache", 86_400),
    ] {
        let opts = IndexOptions::builder().name("created_at_ttl".to_string()).expire_after(std::time::Duration::from_secs(ttl_secs)).build();
        let index = IndexModel::builder().keys(doc! { "created_at": 1 }).options(opts).build();
        ensure_index(db, collection, index, "created_at_ttl").await?;
    }

    {
        let opts = IndexOptions::builder().name("date_unique".to_string()).unique(true).build();
        let index = IndexModel::builder().keys(doc! { "date": 1 }).options(opts).build();
        ensure_index(db, "market_trends", index, "date_unique").await?;
    }

    {
        let opts = IndexOptions::builder().name("ticker_idx".to_string()).build();
        let index = IndexModel::builder().keys(doc! { "ticker": 1 }).options(opts).build();
        ensure_index(db, "screening_results", index, "ticker_idx").await?;
    }
    {
        let opts = IndexOptions::builder().name("processed_at_desc_idx".to_string()).build();
        let index = IndexModel::builder().keys(doc! { "processed_at": -1 }).options(opts).build();
        ensure_index(db, "screening_results", index, "processed_at_desc_idx").await?;
    }
    {
        let opts = IndexOptions::builder().name("job_id_idx".to_string()).build();
        let index = IndexModel::builder().keys(doc! { "job_id": 1 }).options(opts).build();
        ensure_index(db, "screening_results", index, "job_id_idx").await?;
    }

    {
        let opts = IndexOptions::builder().name("archived_at_ttl".to_string()).expire_after(std::time::Duration::from_secs(2_592_000)).build();
        let index = IndexModel::builder().keys(doc! { "archived_at": 1 }).options(opts).build();
        ensure_index(db, "archived_watchlist_items", index, "archived_at_ttl").await?;
    }

    Ok(())
}
