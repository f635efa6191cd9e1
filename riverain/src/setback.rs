//! Zone de recul de construction
//!
//! Intersection de la parcelle avec un tampon tracé le long de ses façades.
//! La zone matérialise la bande de la parcelle située à moins de la distance
//! de recul d'une voie.

use geo::{BooleanOps, LineString, MultiPolygon, Polygon};
use tracing::debug;

use crate::config::Tolerances;
use crate::geom::buffer;
use crate::types::FrontageLine;

/// Zone de recul d'une parcelle le long de ses façades.
///
/// `None` si la parcelle n'a aucune façade ou si la bande tampon ne recoupe
/// pas la parcelle.
pub fn setback_zone(
    parcel: &Polygon,
    frontage: &[FrontageLine],
    tol: &Tolerances,
) -> Option<MultiPolygon> {
    if frontage.is_empty() {
        return None;
    }

    let paths: Vec<LineString> = frontage.iter().map(|f| f.path.clone()).collect();
    let band = buffer::buffer_lines(&paths, tol.setback);
    if band.0.is_empty() {
        return None;
    }

    let zone = MultiPolygon::new(vec![parcel.clone()]).intersection(&band);
    if zone.0.is_empty() {
        debug!("Setback band does not intersect parcel");
        return None;
    }
    Some(zone)
}
