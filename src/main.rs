//! Field Analytics CLI
//!
//! Prints the dashboard report for one query as JSON:
//!
//! ```text
//! field_analytics [snapshot_dir] <mode> <batter> <bowl_kind> <LENGTH[,LENGTH...]> [outfielders]
//! ```
//!
//! The remote service is used when `FIELD_API_URL` is set; otherwise the
//! first argument names the snapshot directory.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use field_analytics::memory::{ModeDataStore, SnapshotLoader};
use field_analytics::services::{Dashboard, RemoteSource, SnapshotSource, StatsSource};
use field_analytics::stats::{BowlKind, LengthSet, MetricContext, Mode};
use field_analytics::utils::{init_tracing, AppConfig, ClientSettings};

const USAGE: &str = "usage: field_analytics [snapshot_dir] <mode> <batter> <bowl_kind> \
                     <LENGTH[,LENGTH...]> [outfielders]";

// ──────────────────────────────────────────────────────────────────────────────
// MAIN ENTRY POINT
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env();
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let source: Arc<dyn StatsSource> = if config.is_remote() {
        info!("Using remote statistics service");
        Arc::new(RemoteSource::connect(&config, &ClientSettings::default())?)
    } else {
        if args.is_empty() {
            bail!("{USAGE}");
        }
        let loader = Arc::new(SnapshotLoader::new(args.remove(0)));
        info!("Using snapshots under {}", loader.root().display());
        Arc::new(SnapshotSource::new(Arc::new(ModeDataStore::new(loader))))
    };

    let (ctx, outfielders) = parse_query(&args)?;
    let report = Dashboard::new(source).report(&ctx, outfielders).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn parse_query(args: &[String]) -> Result<(MetricContext, Option<u8>)> {
    let [mode, batter, bowl_kind, lengths, rest @ ..] = args else {
        bail!("{USAGE}");
    };

    let outfielders = match rest {
        [] => None,
        [n] => Some(n.parse::<u8>().with_context(|| format!("invalid outfielder count {n:?}"))?),
        _ => bail!("{USAGE}"),
    };

    let ctx = MetricContext::new(
        Mode::new(mode)?,
        batter.as_str(),
        BowlKind::new(bowl_kind),
        LengthSet::parse_list(lengths)?,
    );
    Ok((ctx, outfielders))
}
