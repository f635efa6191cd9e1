//! Zones tampons par union booléenne de capsules
//!
//! `geo` ne fournit pas de buffer natif : chaque segment est enveloppé dans
//! une capsule (rectangle + demi-cercles polygonaux aux extrémités), puis les
//! capsules sont unies avec [`geo::BooleanOps`].

use geo::{BooleanOps, Coord, Line, LineString, MultiPolygon, Polygon};
use std::f64::consts::{FRAC_PI_2, PI};

/// Nombre de segments par demi-cercle d'extrémité
const CAP_SEGMENTS: usize = 8;

/// Zone tampon autour d'un ensemble de polylignes
///
/// Retourne un multipolygone vide si `lines` est vide ou ne contient que des
/// polylignes dégénérées.
pub fn buffer_lines(lines: &[LineString], distance: f64) -> MultiPolygon {
    let mut result = MultiPolygon::new(Vec::new());

    for line in lines {
        if line.0.len() == 1 {
            // Point isolé: disque
            let disc = MultiPolygon::new(vec![circle(line.0[0], distance)]);
            result = result.union(&disc);
            continue;
        }
        for segment in line.lines() {
            let capsule = MultiPolygon::new(vec![segment_capsule(segment, distance)]);
            result = result.union(&capsule);
        }
    }

    result
}

/// Capsule autour d'un segment : deux demi-cercles reliés par les flancs
fn segment_capsule(segment: Line, radius: f64) -> Polygon {
    let a = segment.start;
    let b = segment.end;
    let dx = b.x - a.x;
    let dy = b.y - a.y;

    if dx.abs() < f64::EPSILON && dy.abs() < f64::EPSILON {
        return circle(a, radius);
    }

    let theta = dy.atan2(dx);
    let mut ring = Vec::with_capacity(2 * (CAP_SEGMENTS + 1) + 1);

    // Demi-cercle autour de b, de θ-90° à θ+90° (sens trigonométrique)
    arc(&mut ring, b, radius, theta - FRAC_PI_2, theta + FRAC_PI_2);
    // Demi-cercle autour de a, de θ+90° à θ+270°
    arc(&mut ring, a, radius, theta + FRAC_PI_2, theta + 3.0 * FRAC_PI_2);

    let first = ring[0];
    ring.push(first);
    Polygon::new(LineString::new(ring), vec![])
}

/// Ajoute les points d'un arc de cercle à la suite du ring
fn arc(out: &mut Vec<Coord>, center: Coord, radius: f64, from: f64, to: f64) {
    for i in 0..=CAP_SEGMENTS {
        let t = from + (to - from) * (i as f64) / (CAP_SEGMENTS as f64);
        out.push(Coord {
            x: center.x + radius * t.cos(),
            y: center.y + radius * t.sin(),
        });
    }
}

/// Disque polygonal complet
fn circle(center: Coord, radius: f64) -> Polygon {
    let steps = 2 * CAP_SEGMENTS;
    let mut ring = Vec::with_capacity(steps + 1);
    for i in 0..steps {
        let t = 2.0 * PI * (i as f64) / (steps as f64);
        ring.push(Coord {
            x: center.x + radius * t.cos(),
            y: center.y + radius * t.sin(),
        });
    }
    let first = ring[0];
    ring.push(first);
    Polygon::new(LineString::new(ring), vec![])
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, Contains, Point};

    #[test]
    fn test_buffer_single_segment() {
        let line = LineString::new(vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 100.0, y: 0.0 }]);
        let zone = buffer_lines(std::slice::from_ref(&line), 10.0);

        assert!(!zone.0.is_empty());
        // Aire attendue: rectangle 100×20 + disque r=10 (≈ 2314 m²),
        // les demi-cercles polygonaux sous-estiment légèrement
        let area = zone.unsigned_area();
        assert!(area > 2200.0 && area < 2350.0, "area={}", area);

        assert!(zone.contains(&Point::new(50.0, 9.0)));
        assert!(zone.contains(&Point::new(50.0, -9.0)));
        assert!(zone.contains(&Point::new(-5.0, 0.0)));
        assert!(!zone.contains(&Point::new(50.0, 11.0)));
        assert!(!zone.contains(&Point::new(115.0, 0.0)));
    }

    #[test]
    fn test_buffer_polyline_corner() {
        let line = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 50.0, y: 0.0 },
            Coord { x: 50.0, y: 50.0 },
        ]);
        let zone = buffer_lines(std::slice::from_ref(&line), 5.0);

        // Le coin intérieur est couvert par l'union des deux capsules
        assert!(zone.contains(&Point::new(48.0, 2.0)));
        assert!(zone.contains(&Point::new(50.0, 49.0)));
        assert!(!zone.contains(&Point::new(30.0, 30.0)));
    }

    #[test]
    fn test_buffer_empty_input() {
        let zone = buffer_lines(&[], 10.0);
        assert!(zone.0.is_empty());
    }
}
