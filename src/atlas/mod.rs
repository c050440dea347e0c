// src/atlas/mod.rs
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::aggregate::ScalarAggregate;

/// Source-language → world-atlas country names, shipped as a data file so the
/// table can grow without touching code.
static COUNTRY_NAMES: Lazy<HashMap<String, String>> = Lazy::new(|| {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(include_str!("../../data/country_names.csv").as_bytes());
    rdr.records()
        .filter_map(|r| r.ok())
        .filter_map(|r| match (r.get(0), r.get(1)) {
            (Some(from), Some(to)) => Some((from.to_string(), to.to_string())),
            _ => None,
        })
        .collect()
});

/// Translate a source country name to its world-atlas spelling. Names not in
/// the table pass through unchanged, since a raw name may already match.
pub fn atlas_name(origen: &str) -> &str {
    COUNTRY_NAMES.get(origen).map(String::as_str).unwrap_or(origen)
}

#[derive(Debug, Deserialize)]
struct Topology {
    objects: TopologyObjects,
}

#[derive(Debug, Deserialize)]
struct TopologyObjects {
    countries: GeometryCollection,
}

#[derive(Debug, Deserialize)]
struct GeometryCollection {
    geometries: Vec<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(default)]
    properties: GeometryProperties,
}

#[derive(Debug, Default, Deserialize)]
struct GeometryProperties {
    #[serde(default)]
    name: String,
}

/// Pull the country feature names out of a world-atlas topology document.
/// Geometry arcs belong to the map renderer and are not decoded here.
pub fn topology_country_names(topology: &serde_json::Value) -> Result<Vec<String>> {
    let topo: Topology =
        serde_json::from_value(topology.clone()).context("decoding world-atlas topology")?;
    let names: Vec<String> = topo
        .objects
        .countries
        .geometries
        .into_iter()
        .map(|g| g.properties.name)
        .collect();
    debug!(countries = names.len(), "extracted atlas country names");
    Ok(names)
}

/// One shaded region of the choropleth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryValue {
    pub name: String,
    pub value: i64,
}

/// Chart-ready shape for the choropleth map: every atlas country, with the
/// group total routed through the name table, 0 where there is no data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoroplethPayload {
    pub label: String,
    pub countries: Vec<CountryValue>,
}

pub fn choropleth_values(country_names: &[String], totals: &ScalarAggregate) -> ChoroplethPayload {
    let countries = country_names
        .iter()
        .map(|name| {
            let value = totals
                .iter()
                .find(|(origen, _)| {
                    atlas_name(origen) == name.as_str() || origen.as_str() == name.as_str()
                })
                .map(|(_, qty)| *qty)
                .unwrap_or(0);
            CountryValue {
                name: name.clone(),
                value,
            }
        })
        .collect();
    ChoroplethPayload {
        label: "Cantidad de Frutas por País de Origen".to_string(),
        countries,
    }
}
