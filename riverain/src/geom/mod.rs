//! Adaptateur géométrique
//!
//! Regroupe les primitives déléguées à `geo` derrière une petite surface :
//! distances, accrochage au contour, découpe de polygone, décalage
//! perpendiculaire. Tout est exprimé dans le CRS de travail métrique.

pub mod buffer;
pub mod project;

use geo::{
    Area, BooleanOps, Closest, ClosestPoint, EuclideanDistance, Line, LineString, MultiPolygon,
    Point, Polygon,
};

/// Demi-épaisseur de la lame de découpe (1 cm de chaque côté)
const BLADE_HALF_WIDTH: f64 = 0.01;

/// Aire minimale d'un morceau de découpe, en dessous c'est un résidu numérique
const MIN_PIECE_AREA: f64 = 1e-6;

/// Distance minimale d'un point à un ensemble de polylignes
pub fn distance_to_lines(point: Point, lines: &[LineString]) -> f64 {
    lines
        .iter()
        .map(|line| point.euclidean_distance(line))
        .fold(f64::INFINITY, f64::min)
}

/// Point le plus proche sur le ring extérieur d'un polygone, avec sa distance
pub fn nearest_on_ring(polygon: &Polygon, point: Point) -> (Point, f64) {
    let ring = polygon.exterior();
    let nearest = match ring.closest_point(&point) {
        Closest::Intersection(p) | Closest::SinglePoint(p) => p,
        Closest::Indeterminate => ring.points().next().unwrap_or(point),
    };
    let distance = point.euclidean_distance(&nearest);
    (nearest, distance)
}

/// Les deux extrémités de la polyligne sont-elles à moins de `tol` du ring
/// extérieur du polygone ?
pub fn endpoints_near_ring(path: &LineString, polygon: &Polygon, tol: f64) -> bool {
    let ring = polygon.exterior();
    match (path.points().next(), path.points().last()) {
        (Some(start), Some(end)) => {
            start.euclidean_distance(ring) <= tol && end.euclidean_distance(ring) <= tol
        }
        _ => false,
    }
}

/// Découpe un polygone le long d'une polyligne
///
/// Implémentée par différence booléenne contre une lame fine
/// (2 × [`BLADE_HALF_WIDTH`]). Retourne `None` si la découpe ne produit pas au
/// moins deux morceaux : l'appelant conserve alors le polygone intact.
pub fn cut(polygon: &Polygon, line: &LineString) -> Option<Vec<Polygon>> {
    if line.0.len() < 2 {
        return None;
    }

    let blade = buffer::buffer_lines(std::slice::from_ref(line), BLADE_HALF_WIDTH);
    if blade.0.is_empty() {
        return None;
    }

    let remainder = MultiPolygon::new(vec![polygon.clone()]).difference(&blade);
    let pieces: Vec<Polygon> = remainder
        .0
        .into_iter()
        .filter(|p| p.unsigned_area() > MIN_PIECE_AREA)
        .collect();

    if pieces.len() < 2 {
        None
    } else {
        Some(pieces)
    }
}

/// Décale un point perpendiculairement à un segment
///
/// Le côté droit s'entend dans le sens du tracé du segment. Un segment
/// dégénéré rend le point inchangé.
pub fn offset_perpendicular(segment: Line, from: Point, right: bool, distance: f64) -> Point {
    let dx = segment.end.x - segment.start.x;
    let dy = segment.end.y - segment.start.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return from;
    }

    let (nx, ny) = if right {
        (dy / len, -dx / len)
    } else {
        (-dy / len, dx / len)
    };
    Point::new(from.x() + nx * distance, from.y() + ny * distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;

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

    #[test]
    fn test_nearest_on_ring() {
        let parcel = square(100.0);
        let (nearest, distance) = nearest_on_ring(&parcel, Point::new(50.0, 10.0));
        assert!((nearest.x() - 50.0).abs() < 1e-9);
        assert!(nearest.y().abs() < 1e-9);
        assert!((distance - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_endpoints_near_ring() {
        let parcel = square(100.0);
        // Ligne légèrement décalée du bord sud
        let near = LineString::new(vec![Coord { x: 0.0, y: 1.0 }, Coord { x: 100.0, y: 1.0 }]);
        assert!(endpoints_near_ring(&near, &parcel, 1.5));

        // Une extrémité trop loin
        let far = LineString::new(vec![Coord { x: 5.0, y: 1.0 }, Coord { x: 95.0, y: 10.0 }]);
        assert!(!endpoints_near_ring(&far, &parcel, 1.5));
    }

    #[test]
    fn test_cut_square_in_half() {
        let parcel = square(100.0);
        let blade = LineString::new(vec![Coord { x: 50.0, y: 0.0 }, Coord { x: 50.0, y: 100.0 }]);

        let pieces = cut(&parcel, &blade).expect("cut should produce pieces");
        assert_eq!(pieces.len(), 2);

        let total: f64 = pieces.iter().map(|p| p.unsigned_area()).sum();
        // La lame retire ~2 cm × 100 m
        assert!((total - 10000.0).abs() < 10.0, "total={}", total);
    }

    #[test]
    fn test_cut_miss_is_failure() {
        let parcel = square(100.0);
        // Lame entièrement hors du polygone
        let blade = LineString::new(vec![
            Coord { x: 200.0, y: 0.0 },
            Coord { x: 200.0, y: 100.0 },
        ]);
        assert!(cut(&parcel, &blade).is_none());
    }

    #[test]
    fn test_offset_perpendicular() {
        let segment = Line::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 0.0 });
        let from = Point::new(0.0, 0.0);

        let right = offset_perpendicular(segment, from, true, 5.0);
        assert!((right.x() - 0.0).abs() < 1e-9);
        assert!((right.y() - (-5.0)).abs() < 1e-9);

        let left = offset_perpendicular(segment, from, false, 5.0);
        assert!((left.y() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_to_lines() {
        let lines = vec![
            LineString::new(vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 0.0 }]),
            LineString::new(vec![Coord { x: 0.0, y: 50.0 }, Coord { x: 10.0, y: 50.0 }]),
        ];
        let d = distance_to_lines(Point::new(5.0, 10.0), &lines);
        assert!((d - 10.0).abs() < 1e-9);

        assert_eq!(distance_to_lines(Point::new(5.0, 10.0), &[]), f64::INFINITY);
    }
}
