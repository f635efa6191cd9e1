//! Correspondance bord / ligne de référence par distance aux extrémités

use geo::{EuclideanDistance, Line, LineString, Point};

use crate::types::FrontageLine;

/// Un bord correspond à la ligne de référence ssi ses DEUX extrémités sont à
/// moins de `tol` de celle-ci.
///
/// Pas de test au point médian : le comportement extrémités-seules est voulu
/// et documenté, il ne doit pas être "corrigé". Le résultat est invariant à
/// l'inversion du sens du bord.
pub fn matches(edge: Line, reference: &LineString, tol: f64) -> bool {
    let start = Point::from(edge.start);
    let end = Point::from(edge.end);
    start.euclidean_distance(reference) <= tol && end.euclidean_distance(reference) <= tol
}

/// Première façade parente correspondant au bord
///
/// La première correspondance gagne : on n'agrège pas plusieurs façades
/// parentes sur un même bord.
pub fn first_match<'a>(edge: Line, parents: &'a [FrontageLine], tol: f64) -> Option<&'a FrontageLine> {
    parents.iter().find(|parent| matches(edge, &parent.path, tol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UsageCode;
    use geo::Coord;

    fn edge(x1: f64, y1: f64, x2: f64, y2: f64) -> Line {
        Line::new(Coord { x: x1, y: y1 }, Coord { x: x2, y: y2 })
    }

    #[test]
    fn test_both_endpoints_required() {
        let reference = LineString::new(vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 100.0, y: 0.0 }]);

        assert!(matches(edge(0.0, 1.0, 100.0, 1.0), &reference, 2.0));
        // Une seule extrémité proche ne suffit pas
        assert!(!matches(edge(0.0, 1.0, 100.0, 5.0), &reference, 2.0));
        assert!(!matches(edge(0.0, 5.0, 100.0, 5.0), &reference, 2.0));
    }

    #[test]
    fn test_invariant_to_edge_reversal() {
        let reference = LineString::new(vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 100.0, y: 0.0 }]);
        let forward = edge(10.0, 1.0, 90.0, 1.0);
        let backward = edge(90.0, 1.0, 10.0, 1.0);

        assert_eq!(
            matches(forward, &reference, 2.0),
            matches(backward, &reference, 2.0)
        );
    }

    #[test]
    fn test_midpoint_is_ignored() {
        // Référence en "toit" : les extrémités du bord touchent la référence
        // mais son milieu en est à ~4.5 m. La correspondance tient quand même.
        let reference = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 5.0, y: 10.0 },
            Coord { x: 10.0, y: 0.0 },
        ]);
        assert!(matches(edge(0.0, 0.0, 10.0, 0.0), &reference, 2.0));
    }

    #[test]
    fn test_first_match_wins() {
        let parents = vec![
            FrontageLine {
                source_id: "a".to_string(),
                usage: UsageCode::Frontage,
                path: LineString::new(vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 100.0, y: 0.0 }]),
            },
            FrontageLine {
                source_id: "b".to_string(),
                usage: UsageCode::Frontage,
                path: LineString::new(vec![Coord { x: 0.0, y: 1.0 }, Coord { x: 100.0, y: 1.0 }]),
            },
        ];

        // Le bord correspond aux deux façades ; la première déclarée gagne
        let hit = first_match(edge(10.0, 0.5, 90.0, 0.5), &parents, 2.0).unwrap();
        assert_eq!(hit.source_id, "a");
    }

    #[test]
    fn test_no_match() {
        let parents = vec![FrontageLine {
            source_id: "a".to_string(),
            usage: UsageCode::Frontage,
            path: LineString::new(vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 100.0, y: 0.0 }]),
        }];

        assert!(first_match(edge(0.0, 50.0, 100.0, 50.0), &parents, 2.0).is_none());
    }
}
