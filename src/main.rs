use anyhow::{Context, Result};
use cosecha::{
    aggregate::{matrix, scalar},
    atlas::{choropleth_values, topology_country_names},
    errlog::ErrorLog,
    fetch,
    table::{clip_quantities, normalize, parse_table, MAX_QUANTITY, MIN_QUANTITY},
};
use reqwest::Client;
use std::{env, fs, path::PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

/// Inventory column names as they appear in the source CSV.
const ITEM_FIELD: &str = "Nombre";
const GROUP_FIELD: &str = "Origen";
const QTY_FIELD: &str = "Cantidad";

static DEFAULT_DATA_SOURCE: &str = "data/data.csv";
static DEFAULT_ATLAS_URL: &str = "https://unpkg.com/world-atlas@2/countries-50m.json";
static DEFAULT_OUT_DIR: &str = "out";

/// Retrieve the raw inventory table text. `DATA_SOURCE` may be an http(s)
/// URL or a local path.
async fn load_inventory_text(client: &Client, source: &str) -> Result<String> {
    match Url::parse(source) {
        Ok(url) if url.scheme().starts_with("http") => fetch::get_text(client, &url).await,
        _ => tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("reading inventory file {source}")),
    }
}

// Single-threaded by design: every await suspends and resumes on the same
// logical thread, no parallel aggregation.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) configure ────────────────────────────────────────────────
    let data_source = env::var("DATA_SOURCE").unwrap_or_else(|_| DEFAULT_DATA_SOURCE.into());
    let atlas_url = env::var("ATLAS_URL").unwrap_or_else(|_| DEFAULT_ATLAS_URL.into());
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap_or_else(|_| DEFAULT_OUT_DIR.into()));
    fs::create_dir_all(&out_dir)?;

    let client = Client::new();
    let mut errlog = ErrorLog::with_default_capacity(out_dir.join("errors.json"));
    errlog.restore();

    // ─── 3) retrieve & parse inventory ───────────────────────────────
    info!(source = %data_source, "load inventory");
    let text = match load_inventory_text(&client, &data_source).await {
        Ok(t) => t,
        Err(e) => {
            errlog.record(&e, "load inventory table");
            return Err(e);
        }
    };

    let raw = parse_table(&text);
    for d in &raw.diagnostics {
        warn!(line = d.line, message = %d.message, "parse diagnostic");
        errlog.record(&anyhow::anyhow!(d.message.clone()), "parse inventory table");
    }
    let table = normalize(&raw);
    let table = clip_quantities(&table, QTY_FIELD, MIN_QUANTITY, MAX_QUANTITY);
    info!(
        records = table.records.len(),
        diagnostics = table.diagnostics.len(),
        "inventory parsed"
    );

    // ─── 4) aggregate both views ─────────────────────────────────────
    let bar = matrix(&table, ITEM_FIELD, GROUP_FIELD, QTY_FIELD);
    let totals = scalar(&table, GROUP_FIELD, QTY_FIELD);
    info!(
        items = bar.labels.len(),
        groups = totals.len(),
        "aggregates built"
    );

    let bar_path = out_dir.join("bar_chart.json");
    fs::write(&bar_path, serde_json::to_string_pretty(&bar)?)
        .with_context(|| format!("writing {}", bar_path.display()))?;
    info!(path = %bar_path.display(), "bar chart payload written");

    // ─── 5) join totals against the world atlas ──────────────────────
    let atlas_url = Url::parse(&atlas_url).context("invalid atlas URL")?;
    let topology = match fetch::get_json::<serde_json::Value>(&client, &atlas_url).await {
        Ok(t) => t,
        Err(e) => {
            errlog.record(&e, "fetch world atlas");
            return Err(e);
        }
    };
    let countries = match topology_country_names(&topology) {
        Ok(c) => c,
        Err(e) => {
            errlog.record(&e, "decode world atlas");
            return Err(e);
        }
    };
    let choropleth = choropleth_values(&countries, &totals);
    let with_data = choropleth.countries.iter().filter(|c| c.value > 0).count();
    info!(
        countries = countries.len(),
        with_data, "choropleth joined"
    );

    let choropleth_path = out_dir.join("choropleth.json");
    fs::write(&choropleth_path, serde_json::to_string_pretty(&choropleth)?)
        .with_context(|| format!("writing {}", choropleth_path.display()))?;
    info!(path = %choropleth_path.display(), "choropleth payload written");

    Ok(())
}
