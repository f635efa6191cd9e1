//! Normalisation des features cadastrales brutes
//!
//! Les couches sources varient d'un millésime à l'autre : champs
//! d'identifiant renommés, multi-géométries, anneaux non fermés. La
//! normalisation absorbe ces variations une fois pour toutes, en amont du
//! moteur ; aucun module aval ne consulte d'attribut brut.

use std::collections::HashMap;

use geo::{Area, Geometry, LineString, Polygon};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::RiverainError;
use crate::types::{BoundaryLine, Parcel, UsageCode};

/// Chaînes de repli des attributs, du nom le plus récent au plus ancien
const ID_FIELDS: &[&str] = &["objectid", "OBJECTID", "__OBJECTID", "OBJECTID_1"];
const USAGE_FIELDS: &[&str] = &["usage_code", "USAGE_CODE"];
const RENDER_FIELDS: &[&str] = &["render_normal", "RENDER_NORMAL"];
const PIN_FIELDS: &[&str] = &["pin", "PIN"];
const LOT_FIELDS: &[&str] = &["lot", "LOT", "lot_number"];
const AREA_FIELDS: &[&str] = &["shape_area", "Shape_Area", "SHAPE_AREA"];

/// Feature source, telle que reçue de la couche
#[derive(Debug, Clone)]
pub struct RawFeature {
    pub geometry: Geometry,
    pub attributes: HashMap<String, Value>,
}

/// Premier attribut non nul de la chaîne de repli, rendu en texte
fn first_attribute(attributes: &HashMap<String, Value>, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match attributes.get(*field) {
        Some(Value::Null) | None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

fn numeric_attribute(attributes: &HashMap<String, Value>, fields: &[&str]) -> Option<f64> {
    fields.iter().find_map(|field| match attributes.get(*field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}

/// Ferme l'anneau si la source l'a laissé ouvert
fn closed_ring(mut ring: LineString, context: &str) -> LineString {
    if ring.0.len() >= 2 && ring.0.first() != ring.0.last() {
        warn!(feature = context, "Unclosed ring in source layer, closing it");
        let first = ring.0[0];
        ring.0.push(first);
    }
    ring
}

/// Normalise une feature parcelle.
///
/// Un `MultiPolygon` est réduit à sa plus grande composante : les parcelles
/// multi-parties de la couche source sont des artefacts de numérisation.
pub fn parcel_from_raw(raw: &RawFeature) -> Result<Parcel, RiverainError> {
    let id = first_attribute(&raw.attributes, ID_FIELDS)
        .ok_or_else(|| RiverainError::invalid_parcel("?", "no identifier attribute"))?;

    let polygon = match &raw.geometry {
        Geometry::Polygon(p) => p.clone(),
        Geometry::MultiPolygon(mp) => {
            if mp.0.is_empty() {
                return Err(RiverainError::invalid_parcel(&id, "empty multipolygon"));
            }
            if mp.0.len() > 1 {
                debug!(parcel = %id, parts = mp.0.len(), "Keeping largest part of multipolygon");
            }
            mp.0.iter()
                .max_by(|a, b| {
                    a.unsigned_area()
                        .partial_cmp(&b.unsigned_area())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .cloned()
                .ok_or_else(|| RiverainError::invalid_parcel(&id, "empty multipolygon"))?
        }
        _ => {
            return Err(RiverainError::invalid_parcel(
                &id,
                "geometry is not a polygon",
            ))
        }
    };

    let exterior = closed_ring(polygon.exterior().clone(), &id);
    if exterior.0.len() < 4 {
        return Err(RiverainError::invalid_parcel(
            &id,
            "exterior ring has fewer than 4 points",
        ));
    }
    let interiors: Vec<LineString> = polygon
        .interiors()
        .iter()
        .map(|ring| closed_ring(ring.clone(), &id))
        .collect();

    Ok(Parcel {
        id,
        geometry: Polygon::new(exterior, interiors),
        pin: first_attribute(&raw.attributes, PIN_FIELDS),
        lot: first_attribute(&raw.attributes, LOT_FIELDS),
        area: numeric_attribute(&raw.attributes, AREA_FIELDS),
    })
}

/// Normalise une feature de limite cadastrale.
///
/// Une `MultiLineString` donne une limite par composante, suffixée `#i` ;
/// chaque composante est classée indépendamment en aval.
pub fn boundary_lines_from_raw(raw: &RawFeature) -> Result<Vec<BoundaryLine>, RiverainError> {
    let id = first_attribute(&raw.attributes, ID_FIELDS)
        .ok_or_else(|| RiverainError::invalid_boundary_line("?", "no identifier attribute"))?;
    let usage = UsageCode::from_attributes(
        first_attribute(&raw.attributes, USAGE_FIELDS).as_deref(),
        first_attribute(&raw.attributes, RENDER_FIELDS).as_deref(),
    );

    let paths: Vec<LineString> = match &raw.geometry {
        Geometry::LineString(ls) => vec![ls.clone()],
        Geometry::MultiLineString(mls) => mls.0.clone(),
        _ => {
            return Err(RiverainError::invalid_boundary_line(
                &id,
                "geometry is not a linestring",
            ))
        }
    };
    if paths.is_empty() || paths.iter().any(|p| p.0.len() < 2) {
        return Err(RiverainError::invalid_boundary_line(
            &id,
            "degenerate path",
        ));
    }

    let mut paths = paths;
    if paths.len() == 1 {
        let path = paths.remove(0);
        return Ok(vec![BoundaryLine { id, path, usage }]);
    }

    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(i, path)| BoundaryLine {
            id: format!("{id}#{i}"),
            path,
            usage,
        })
        .collect())
}

/// Position d'un pilier depuis sa feature source
pub fn pillar_position_from_raw(raw: &RawFeature) -> Result<(String, geo::Point), RiverainError> {
    let id = first_attribute(&raw.attributes, ID_FIELDS)
        .ok_or_else(|| RiverainError::invalid_pillar("?", "no identifier attribute"))?;
    match &raw.geometry {
        Geometry::Point(p) => Ok((id, *p)),
        _ => Err(RiverainError::invalid_pillar(&id, "geometry is not a point")),
    }
}
