//! Classification des lignes limites d'une parcelle

use geo::Polygon;
use tracing::debug;

use crate::config::Tolerances;
use crate::geom;
use crate::types::{BoundaryLine, FrontageLine, UsageCode};

/// Résultat de classification : chaque ligne retenue tombe dans exactement
/// un des trois paniers
#[derive(Debug, Clone, Default)]
pub struct Classified {
    /// Lignes en façade de voie publique
    pub frontage: Vec<FrontageLine>,
    /// Limites intérieures
    pub interior: Vec<BoundaryLine>,
    /// Tout le reste
    pub other: Vec<BoundaryLine>,
}

/// Classe les lignes limites autour d'une parcelle.
///
/// Pré-filtre : une ligne n'est retenue que si ses DEUX extrémités sont à
/// moins de `endpoint_snap` du contour de la parcelle. Les couches
/// parcellaire et limites proviennent de levés indépendants et ne coïncident
/// pas exactement ; les lignes trop éloignées sont exclues même si leur code
/// d'usage est correct.
pub fn classify(lines: Vec<BoundaryLine>, parcel: &Polygon, tol: &Tolerances) -> Classified {
    let mut out = Classified::default();

    for line in lines {
        if !geom::endpoints_near_ring(&line.path, parcel, tol.endpoint_snap) {
            debug!(line = %line.id, "Boundary line endpoints beyond snap tolerance, excluded");
            continue;
        }

        match line.usage {
            UsageCode::Frontage => out.frontage.push(FrontageLine::from_boundary(&line)),
            UsageCode::Interior => out.interior.push(line),
            UsageCode::Other => out.other.push(line),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, LineString};

    fn square(size: f64) -> Polygon {
        Polygon::new(
            LineString::new(vec![
                Coord { x: 0.0, y: 0.0 },
                Coord { x: size, y: 0.0 },
                Coord { x: size, y: size },
                Coord { x: 0.0, y: size },
                Coord { x: 0.0, y: 0.0 },
            ]),
            vec![],
        )
    }

    fn line(id: &str, usage: UsageCode, coords: Vec<(f64, f64)>) -> BoundaryLine {
        BoundaryLine {
            id: id.to_string(),
            path: LineString::new(coords.into_iter().map(|(x, y)| Coord { x, y }).collect()),
            usage,
        }
    }

    #[test]
    fn test_classify_buckets() {
        let parcel = square(100.0);
        let lines = vec![
            // Bord sud, légèrement décalé comme une vraie couche limite
            line(
                "south",
                UsageCode::Frontage,
                vec![(0.0, 0.5), (100.0, 0.5)],
            ),
            line("east", UsageCode::Interior, vec![(99.5, 0.0), (99.5, 100.0)]),
            line("north", UsageCode::Other, vec![(0.0, 100.0), (100.0, 100.0)]),
        ];

        let out = classify(lines, &parcel, &Tolerances::default());
        assert_eq!(out.frontage.len(), 1);
        assert_eq!(out.interior.len(), 1);
        assert_eq!(out.other.len(), 1);
        assert_eq!(out.frontage[0].source_id, "south");
    }

    #[test]
    fn test_endpoint_prefilter_excludes_misaligned_lines() {
        let parcel = square(100.0);
        // Code d'usage correct mais extrémités à 3 m du contour
        let lines = vec![line(
            "far",
            UsageCode::Frontage,
            vec![(5.0, 3.0), (95.0, 3.0)],
        )];

        let out = classify(lines, &parcel, &Tolerances::default());
        assert!(out.frontage.is_empty());
        assert!(out.interior.is_empty());
        assert!(out.other.is_empty());
    }

    #[test]
    fn test_dual_field_rule() {
        // usage_code=1 et render_normal=1-Y doivent tous deux donner façade
        let by_usage = UsageCode::from_attributes(Some("1"), None);
        let by_render = UsageCode::from_attributes(None, Some("1-Y"));
        assert_eq!(by_usage, UsageCode::Frontage);
        assert_eq!(by_render, UsageCode::Frontage);
    }
}
