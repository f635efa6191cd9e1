//! Chargement des couches GeoJSON et source de piliers
//!
//! Les couches locales remplacent les services de features distants : requête
//! directe ou identify, tout aboutit à la même forme normalisée côté moteur.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use geo::{Contains, Coord, Geometry, MultiPolygon};
use geojson::FeatureCollection;
use tracing::{debug, warn};

use riverain::geom::project::{SourceCrs, WorkingCrs};
use riverain::normalize::{self, RawFeature};
use riverain::registry::{Pillar, PillarSource};
use riverain::RiverainError;

/// Charge une couche GeoJSON en features brutes, sans reprojection
pub fn load_features(path: &Path) -> Result<Vec<RawFeature>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    let collection: FeatureCollection = raw
        .parse()
        .with_context(|| format!("Invalid GeoJSON in {}", path.display()))?;

    let mut features = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let Some(geometry) = feature.geometry else {
            warn!("Feature without geometry, skipping");
            continue;
        };
        let geometry: Geometry = match geometry.value.try_into() {
            Ok(g) => g,
            Err(e) => {
                warn!(error = %e, "Unsupported geometry, skipping feature");
                continue;
            }
        };
        let attributes: HashMap<String, serde_json::Value> = feature
            .properties
            .map(|props| props.into_iter().collect())
            .unwrap_or_default();
        features.push(RawFeature {
            geometry,
            attributes,
        });
    }

    debug!(path = %path.display(), count = features.len(), "Layer loaded");
    Ok(features)
}

/// Première coordonnée d'une géométrie, pour déduire le CRS de travail
fn sample_coord(geometry: &Geometry) -> Option<Coord> {
    match geometry {
        Geometry::Point(p) => Some(p.0),
        Geometry::LineString(ls) => ls.0.first().copied(),
        Geometry::Polygon(p) => p.exterior().0.first().copied(),
        Geometry::MultiPoint(mp) => mp.0.first().map(|p| p.0),
        Geometry::MultiLineString(mls) => mls.0.first().and_then(|ls| ls.0.first().copied()),
        Geometry::MultiPolygon(mp) => mp.0.first().and_then(|p| p.exterior().0.first().copied()),
        _ => None,
    }
}

/// Reprojette toutes les géométries d'une couche vers le CRS de travail
fn reproject(features: &mut [RawFeature], crs: WorkingCrs, source: SourceCrs) {
    for feature in features.iter_mut() {
        feature.geometry = transform_geometry(&feature.geometry, crs, source);
    }
}

fn transform_geometry(geometry: &Geometry, crs: WorkingCrs, source: SourceCrs) -> Geometry {
    use geo::{MultiLineString, MultiPoint};

    match geometry {
        Geometry::Point(p) => Geometry::Point(crs.transform_point(*p, source)),
        Geometry::LineString(ls) => {
            Geometry::LineString(crs.transform_line_string(ls, source))
        }
        Geometry::Polygon(p) => Geometry::Polygon(crs.transform_polygon(p, source)),
        Geometry::MultiPoint(mp) => Geometry::MultiPoint(MultiPoint::new(
            mp.0.iter()
                .map(|p| crs.transform_point(*p, source))
                .collect(),
        )),
        Geometry::MultiLineString(mls) => Geometry::MultiLineString(MultiLineString::new(
            mls.0
                .iter()
                .map(|ls| crs.transform_line_string(ls, source))
                .collect(),
        )),
        Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(MultiPolygon::new(
            mp.0.iter()
                .map(|p| crs.transform_polygon(p, source))
                .collect(),
        )),
        other => other.clone(),
    }
}

/// Jeu de données complet d'une exécution, reprojeté dans le CRS de travail
pub struct Dataset {
    pub parcels: Vec<RawFeature>,
    pub boundaries: Vec<RawFeature>,
    pub pillars: Vec<Pillar>,
    pub crs: WorkingCrs,
}

impl Dataset {
    /// Charge et reprojette les couches.
    ///
    /// Le CRS de travail est déduit de la première coordonnée de la couche
    /// parcelles ; un SRID métrique passe tel quel.
    pub fn load(
        parcels_path: &Path,
        boundaries_path: &Path,
        pillars_path: Option<&Path>,
        srid: u32,
    ) -> Result<Self> {
        let source = SourceCrs::from_epsg(srid);
        let mut parcels = load_features(parcels_path)?;
        let mut boundaries = load_features(boundaries_path)?;

        let sample = parcels
            .iter()
            .find_map(|f| sample_coord(&f.geometry))
            .context("Parcel layer has no usable geometry")?;
        let crs = WorkingCrs::from_source_sample(sample, source);
        debug!(srid = srid, working_epsg = ?crs.epsg(), "Working CRS selected");

        reproject(&mut parcels, crs, source);
        reproject(&mut boundaries, crs, source);

        let mut pillars = Vec::new();
        if let Some(path) = pillars_path {
            let mut raw = load_features(path)?;
            reproject(&mut raw, crs, source);
            for feature in &raw {
                match normalize::pillar_position_from_raw(feature) {
                    Ok((id, position)) => pillars.push(Pillar { id, position }),
                    Err(e) => warn!(error = %e, "Skipping invalid pillar feature"),
                }
            }
        }

        Ok(Dataset {
            parcels,
            boundaries,
            pillars,
            crs,
        })
    }

    /// Feature parcelle portant l'identifiant demandé
    pub fn parcel_by_id(&self, id: &str) -> Result<&RawFeature> {
        self.parcels
            .iter()
            .find(|f| {
                normalize::parcel_from_raw(f)
                    .map(|p| p.id == id)
                    .unwrap_or(false)
            })
            .with_context(|| format!("No parcel with id {id} in layer"))
    }
}

/// Source de piliers adossée à la couche GeoJSON chargée.
///
/// La requête est bornée par un timeout, comme le serait un service distant ;
/// l'expiration est rendue en erreur de requête, que le registre dégrade.
pub struct GeojsonPillars {
    pillars: Vec<Pillar>,
    timeout: Duration,
}

impl GeojsonPillars {
    pub fn new(pillars: Vec<Pillar>, timeout_secs: u64) -> Self {
        Self {
            pillars,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl PillarSource for GeojsonPillars {
    async fn pillars_within(&self, area: &MultiPolygon) -> Result<Vec<Pillar>, RiverainError> {
        let query = async {
            self.pillars
                .iter()
                .filter(|p| area.contains(&p.position))
                .cloned()
                .collect::<Vec<_>>()
        };
        tokio::time::timeout(self.timeout, query)
            .await
            .map_err(|_| RiverainError::pillar_query("pillar query timed out"))
    }
}
