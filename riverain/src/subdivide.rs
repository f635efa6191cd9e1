//! Machine à états de la subdivision interactive
//!
//! Une session accumule des points cliqués en polylignes de découpe, puis
//! découpe la parcelle parente et propage la façade aux sous-polygones via le
//! matcher d'extrémités.

use geo::{Contains, EuclideanLength, LineString, Point, Polygon};
use tracing::{debug, warn};

use crate::config::Tolerances;
use crate::error::RiverainError;
use crate::geom;
use crate::matcher;
use crate::types::{
    FrontageLine, Parcel, PointKind, SubPolygon, SubdivisionLine, SubdivisionPoint,
};

/// Longueur minimale d'une arête pour participer à l'héritage de façade
const MIN_EDGE_LENGTH: f64 = 0.1;

/// État de la session de subdivision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubdivisionState {
    #[default]
    Idle,
    Drawing,
}

/// Résultat d'un clic de subdivision
#[derive(Debug)]
pub struct ClickOutcome {
    /// Le point retenu (accroché ou brut)
    pub point: SubdivisionPoint,

    /// La ligne finalisée par ce clic, le cas échéant
    pub finalized: Option<SubdivisionLine>,
}

/// Session de subdivision d'une parcelle
#[derive(Debug, Default)]
pub struct Subdivision {
    state: SubdivisionState,
    pending: Vec<SubdivisionPoint>,
    lines: Vec<SubdivisionLine>,
}

impl Subdivision {
    pub fn state(&self) -> SubdivisionState {
        self.state
    }

    /// Lignes de découpe finalisées, dans l'ordre de dessin
    pub fn lines(&self) -> &[SubdivisionLine] {
        &self.lines
    }

    /// Passe en mode dessin. L'appelant garantit qu'une parcelle est
    /// sélectionnée avec sa façade en cache.
    pub fn enable(&mut self) -> Result<(), RiverainError> {
        if self.state == SubdivisionState::Drawing {
            return Err(RiverainError::subdivision("subdivision already active"));
        }
        self.state = SubdivisionState::Drawing;
        self.pending.clear();
        self.lines.clear();
        Ok(())
    }

    /// Abandonne la session et efface tout l'état accumulé
    pub fn clear(&mut self) {
        self.state = SubdivisionState::Idle;
        self.pending.clear();
        self.lines.clear();
    }

    /// Traite un clic pendant le dessin.
    ///
    /// Règles d'accrochage, dans l'ordre :
    /// - premier point d'une ligne → accroché au contour, `boundary` ;
    /// - clic hors de la parcelle → accroché au contour, `boundary` ;
    /// - clic intérieur à moins de `boundary_snap` du contour → accroché,
    ///   `boundary` ;
    /// - sinon → position brute, `midpoint`.
    ///
    /// Une ligne se finalise dès qu'elle a ≥ 2 points et que le point qui
    /// vient d'être ajouté est `boundary` ; l'accumulateur repart alors pour
    /// une nouvelle ligne, toujours en mode dessin.
    pub fn add_click(
        &mut self,
        click: Point,
        parcel: &Polygon,
        tol: &Tolerances,
    ) -> Result<ClickOutcome, RiverainError> {
        if self.state != SubdivisionState::Drawing {
            return Err(RiverainError::subdivision("subdivision not enabled"));
        }

        let (nearest, ring_distance) = geom::nearest_on_ring(parcel, click);
        let inside = parcel.contains(&click);
        let first = self.pending.is_empty();

        let snap = first || !inside || ring_distance <= tol.boundary_snap;
        let point = if snap {
            SubdivisionPoint {
                position: nearest,
                kind: PointKind::Boundary,
                snapped: true,
                raw_click: click,
            }
        } else {
            SubdivisionPoint {
                position: click,
                kind: PointKind::Midpoint,
                snapped: false,
                raw_click: click,
            }
        };

        self.pending.push(point.clone());

        let finalized = if self.pending.len() >= 2 && point.kind == PointKind::Boundary {
            let line = build_line(std::mem::take(&mut self.pending));
            debug!(label = %line.label, points = line.points.len(), "Subdivision line finalized");
            self.lines.push(line.clone());
            Some(line)
        } else {
            None
        };

        Ok(ClickOutcome { point, finalized })
    }

    /// Termine la subdivision : découpe la parcelle par chaque ligne dessinée
    /// et propage la façade parente aux sous-polygones.
    ///
    /// Quitte toujours le mode dessin, succès ou échec ; aucun état partiel
    /// n'est conservé.
    pub fn complete(
        &mut self,
        parcel: &Parcel,
        frontage: &[FrontageLine],
        tol: &Tolerances,
    ) -> Result<Vec<SubPolygon>, RiverainError> {
        let result = self.run_completion(parcel, frontage, tol);
        self.clear();
        result
    }

    fn run_completion(
        &self,
        parcel: &Parcel,
        frontage: &[FrontageLine],
        tol: &Tolerances,
    ) -> Result<Vec<SubPolygon>, RiverainError> {
        if self.state != SubdivisionState::Drawing {
            return Err(RiverainError::subdivision("subdivision not enabled"));
        }
        if self.lines.is_empty() {
            return Err(RiverainError::subdivision(
                "at least one completed subdivision line is required",
            ));
        }

        // Découpe itérative : chaque ligne découpe tous les morceaux courants.
        // Un échec de découpe conserve le morceau intact, il n'est jamais perdu.
        let mut pieces: Vec<Polygon> = vec![parcel.geometry.clone()];
        for line in &self.lines {
            let mut next = Vec::with_capacity(pieces.len() + 1);
            for piece in pieces {
                match geom::cut(&piece, &line.path) {
                    Some(parts) => next.extend(parts),
                    None => {
                        warn!(line = %line.label, "Cut produced no pieces, keeping polygon unmodified");
                        next.push(piece);
                    }
                }
            }
            pieces = next;
        }

        // Propagation de façade : la façade vient uniquement du parent, jamais
        // d'une nouvelle requête (le contour d'un sous-polygone n'est pas
        // cadastral).
        let subs = pieces
            .into_iter()
            .enumerate()
            .map(|(index, geometry)| {
                let inherited: Vec<FrontageLine> = geometry
                    .exterior()
                    .lines()
                    // Les coiffes de la lame laissent des micro-arêtes près de
                    // la découpe, sans façade utile
                    .filter(|edge| edge.euclidean_length() > MIN_EDGE_LENGTH)
                    .filter_map(|edge| {
                        matcher::first_match(edge, frontage, tol.edge_match)
                            .map(|parent| FrontageLine::inherited(parent, edge))
                    })
                    .collect();

                SubPolygon {
                    id: format!("SUB_{}_{}", parcel.id, index),
                    parent: parcel.id.clone(),
                    geometry,
                    frontage: inherited,
                }
            })
            .collect();

        Ok(subs)
    }
}

fn build_line(points: Vec<SubdivisionPoint>) -> SubdivisionLine {
    let path = LineString::new(points.iter().map(|p| p.position.0).collect());
    let label = points
        .iter()
        .map(|p| p.kind.to_string())
        .collect::<Vec<_>>()
        .join(" to ");
    SubdivisionLine {
        points,
        path,
        label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UsageCode;
    use geo::{Area, Coord};

    fn square_parcel(size: f64) -> Parcel {
        Parcel {
            id: "42".to_string(),
            geometry: Polygon::new(
                LineString::new(vec![
                    Coord { x: 0.0, y: 0.0 },
                    Coord { x: size, y: 0.0 },
                    Coord { x: size, y: size },
                    Coord { x: 0.0, y: size },
                    Coord { x: 0.0, y: 0.0 },
                ]),
                vec![],
            ),
            pin: None,
            lot: None,
            area: None,
        }
    }

    fn south_frontage(size: f64) -> Vec<FrontageLine> {
        vec![FrontageLine {
            source_id: "south".to_string(),
            usage: UsageCode::Frontage,
            path: LineString::new(vec![Coord { x: 0.0, y: 0.0 }, Coord { x: size, y: 0.0 }]),
        }]
    }

    #[test]
    fn test_outside_inside_outside_sequence() {
        let parcel = square_parcel(100.0);
        let tol = Tolerances::default();
        let mut session = Subdivision::default();
        session.enable().unwrap();

        // (a) hors parcelle, (b) intérieur loin des bords, (c) hors parcelle
        let a = session
            .add_click(Point::new(50.0, -20.0), &parcel.geometry, &tol)
            .unwrap();
        assert_eq!(a.point.kind, PointKind::Boundary);
        assert!(a.finalized.is_none());

        let b = session
            .add_click(Point::new(40.0, 50.0), &parcel.geometry, &tol)
            .unwrap();
        assert_eq!(b.point.kind, PointKind::Midpoint);
        assert!(!b.point.snapped);
        assert!(b.finalized.is_none());

        let c = session
            .add_click(Point::new(50.0, 120.0), &parcel.geometry, &tol)
            .unwrap();
        assert_eq!(c.point.kind, PointKind::Boundary);

        let line = c.finalized.expect("third boundary click finalizes the line");
        assert_eq!(line.points.len(), 3);
        assert_eq!(line.label, "boundary to midpoint to boundary");
        assert_eq!(session.lines().len(), 1);
    }

    #[test]
    fn test_first_point_always_boundary() {
        let parcel = square_parcel(100.0);
        let tol = Tolerances::default();
        let mut session = Subdivision::default();
        session.enable().unwrap();

        // Clic au centre de la parcelle : premier point, accroché quand même
        let outcome = session
            .add_click(Point::new(50.0, 50.0), &parcel.geometry, &tol)
            .unwrap();
        assert_eq!(outcome.point.kind, PointKind::Boundary);
        assert!(outcome.point.snapped);
    }

    #[test]
    fn test_inner_click_near_edge_snaps() {
        let parcel = square_parcel(100.0);
        let tol = Tolerances::default();
        let mut session = Subdivision::default();
        session.enable().unwrap();

        session
            .add_click(Point::new(20.0, -5.0), &parcel.geometry, &tol)
            .unwrap();
        // Intérieur mais à 3 m du bord sud → accroché
        let outcome = session
            .add_click(Point::new(60.0, 3.0), &parcel.geometry, &tol)
            .unwrap();
        assert_eq!(outcome.point.kind, PointKind::Boundary);
        assert!((outcome.point.position.y()).abs() < 1e-9);
        // Deux points boundary → ligne "boundary to boundary"
        let line = outcome.finalized.unwrap();
        assert_eq!(line.label, "boundary to boundary");
    }

    #[test]
    fn test_single_point_never_finalizes() {
        let parcel = square_parcel(100.0);
        let tol = Tolerances::default();
        let mut session = Subdivision::default();
        session.enable().unwrap();

        let outcome = session
            .add_click(Point::new(50.0, -10.0), &parcel.geometry, &tol)
            .unwrap();
        assert!(outcome.finalized.is_none());
        assert!(session.lines().is_empty());

        // Compléter sans ligne finalisée est une erreur
        let err = session.complete(&parcel, &south_frontage(100.0), &tol);
        assert!(err.is_err());
        assert_eq!(session.state(), SubdivisionState::Idle);
    }

    #[test]
    fn test_complete_cuts_and_propagates() {
        let parcel = square_parcel(100.0);
        let frontage = south_frontage(100.0);
        let tol = Tolerances::default();
        let mut session = Subdivision::default();
        session.enable().unwrap();

        // Découpe horizontale à y=50 : seule la moitié sud garde la façade
        session
            .add_click(Point::new(-10.0, 50.0), &parcel.geometry, &tol)
            .unwrap();
        session
            .add_click(Point::new(110.0, 50.0), &parcel.geometry, &tol)
            .unwrap();

        let subs = session.complete(&parcel, &frontage, &tol).unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(session.state(), SubdivisionState::Idle);

        for (index, sub) in subs.iter().enumerate() {
            assert_eq!(sub.id, format!("SUB_42_{}", index));
            assert_eq!(sub.parent, "42");
            assert!(sub.geometry.unsigned_area() > 4000.0);
        }

        let with_frontage: Vec<&SubPolygon> =
            subs.iter().filter(|s| !s.frontage.is_empty()).collect();
        assert_eq!(with_frontage.len(), 1);
        // La façade héritée longe le bord sud
        for f in &with_frontage[0].frontage {
            assert_eq!(f.source_id, "south");
            for coord in f.path.coords() {
                assert!(coord.y.abs() < 2.0, "inherited edge strays from y=0");
            }
        }
    }

    #[test]
    fn test_replay_is_deterministic() {
        let parcel = square_parcel(100.0);
        let tol = Tolerances::default();
        let clicks = [
            Point::new(50.0, -20.0),
            Point::new(40.0, 50.0),
            Point::new(50.0, 120.0),
        ];

        let run = |clicks: &[Point]| {
            let mut session = Subdivision::default();
            session.enable().unwrap();
            for click in clicks {
                session.add_click(*click, &parcel.geometry, &tol).unwrap();
            }
            session
                .lines()
                .iter()
                .map(|l| (l.label.clone(), l.path.clone()))
                .collect::<Vec<_>>()
        };

        assert_eq!(run(&clicks), run(&clicks));
    }
}
