//! Types de données canoniques du moteur
//!
//! Toutes les géométries de ce module sont exprimées dans le CRS de travail
//! métrique (voir [`crate::geom::project`]) : la reprojection a lieu une seule
//! fois, à la frontière de normalisation, jamais dans la logique de décision.

use geo::{Line, LineString, Point, Polygon};
use std::collections::HashMap;
use std::fmt;

/// Identifiant de parcelle (ou de sous-polygone `SUB_<parent>_<index>`)
pub type ParcelId = String;

/// Classification d'usage d'une ligne limite
///
/// Deux couches amont encodent la même sémantique sous deux champs distincts
/// (`usage_code` et `render_normal`) ; les deux sont combinés ici une seule
/// fois, à la normalisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageCode {
    /// Limite en façade de voie publique
    Frontage,
    /// Limite intérieure
    Interior,
    /// Tout le reste
    Other,
}

impl UsageCode {
    /// Combine `usage_code` et `render_normal` en une classification unique.
    ///
    /// Façade ssi `usage_code` ∈ {1, 1-Y, 1-N} OU `render_normal` ∈ {1-Y, 1-N}.
    /// Intérieure ssi `usage_code` == 2.
    pub fn from_attributes(usage_code: Option<&str>, render_normal: Option<&str>) -> Self {
        let usage = usage_code.map(str::trim);
        let render = render_normal.map(str::trim);

        if matches!(usage, Some("1") | Some("1-Y") | Some("1-N"))
            || matches!(render, Some("1-Y") | Some("1-N"))
        {
            UsageCode::Frontage
        } else if usage == Some("2") {
            UsageCode::Interior
        } else {
            UsageCode::Other
        }
    }
}

/// Une ligne limite cadastrale, immuable une fois normalisée
#[derive(Debug, Clone)]
pub struct BoundaryLine {
    /// Identifiant unique de la ligne
    pub id: String,

    /// Tracé (au moins 2 points)
    pub path: LineString,

    /// Classification d'usage
    pub usage: UsageCode,
}

/// Une ligne limite classée en façade, portée par la sélection courante
///
/// Remplacée en bloc à chaque nouvelle sélection de parcelle, et propagée
/// telle quelle aux sous-polygones lors d'une subdivision.
#[derive(Debug, Clone)]
pub struct FrontageLine {
    /// Identifiant de la ligne limite source
    pub source_id: String,

    /// Classification portée (toujours `Frontage` pour une ligne directe,
    /// conservée inchangée lors de l'héritage)
    pub usage: UsageCode,

    /// Tracé de la façade
    pub path: LineString,
}

impl FrontageLine {
    /// Construit une façade depuis une ligne limite classée
    pub fn from_boundary(line: &BoundaryLine) -> Self {
        Self {
            source_id: line.id.clone(),
            usage: line.usage,
            path: line.path.clone(),
        }
    }

    /// Construit un segment de façade hérité lors d'une subdivision :
    /// le tracé est le bord du sous-polygone, les attributs ceux du parent.
    pub fn inherited(parent: &FrontageLine, edge: Line) -> Self {
        Self {
            source_id: parent.source_id.clone(),
            usage: parent.usage,
            path: LineString::new(vec![edge.start, edge.end]),
        }
    }
}

/// Une parcelle cadastrale normalisée
#[derive(Debug, Clone)]
pub struct Parcel {
    /// Identifiant unique (premier champ non vide de la chaîne de repli)
    pub id: ParcelId,

    /// Géométrie : ring extérieur fermé, ≥ 4 points
    pub geometry: Polygon,

    /// Numéro PIN si présent
    pub pin: Option<String>,

    /// Numéro de lot si présent
    pub lot: Option<String>,

    /// Surface déclarée si présente
    pub area: Option<f64>,
}

/// Nature d'un point de subdivision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    /// Point accroché au contour de la parcelle
    Boundary,
    /// Point intermédiaire à l'intérieur de la parcelle
    Midpoint,
}

impl fmt::Display for PointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointKind::Boundary => write!(f, "boundary"),
            PointKind::Midpoint => write!(f, "midpoint"),
        }
    }
}

/// Un point placé pendant une session de subdivision
#[derive(Debug, Clone)]
pub struct SubdivisionPoint {
    /// Position retenue (accrochée ou brute)
    pub position: Point,

    /// Nature du point
    pub kind: PointKind,

    /// Le point a-t-il été accroché au contour ?
    pub snapped: bool,

    /// Position brute du clic
    pub raw_click: Point,
}

/// Une ligne de subdivision finalisée
#[derive(Debug, Clone)]
pub struct SubdivisionLine {
    /// Points dans l'ordre de placement
    pub points: Vec<SubdivisionPoint>,

    /// Polyligne passant par tous les points
    pub path: LineString,

    /// Libellé lisible, ex. "boundary to midpoint to boundary"
    pub label: String,
}

/// Un polygone issu de la découpe d'une parcelle
#[derive(Debug, Clone)]
pub struct SubPolygon {
    /// Identifiant dérivé `SUB_<parent>_<index>`
    pub id: String,

    /// Identifiant de la parcelle parente
    pub parent: ParcelId,

    /// Géométrie du sous-polygone
    pub geometry: Polygon,

    /// Segments de façade hérités du parent (vide si aucun bord ne correspond)
    pub frontage: Vec<FrontageLine>,
}

/// Extrémité du premier segment de façade utilisée pour l'implantation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentEnd {
    Start,
    End,
}

/// Côté latéral du segment, vu dans le sens du tracé
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LateralSide {
    Right,
    Left,
}

/// Implantation choisie pour un nœud potentiel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub end: SegmentEnd,
    pub side: LateralSide,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = match self.end {
            SegmentEnd::Start => "start",
            SegmentEnd::End => "end",
        };
        let side = match self.side {
            LateralSide::Right => "right",
            LateralSide::Left => "left",
        };
        write!(f, "{}-{}", end, side)
    }
}

/// Nature d'un nœud de raccordement
///
/// Le caractère spéculatif est porté par le type, pas par un booléen : les
/// règles de purge (`remove_potential_for`, `remove_all_potential`) ne peuvent
/// s'appliquer qu'aux variantes `Potential`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Pilier matériel issu de l'inventaire externe
    Pillar,
    /// Point de service confirmé, géré par l'application
    ServicePoint,
    /// Point de service potentiel, spéculatif, au plus un par parcelle
    Potential {
        /// Parcelle pour laquelle le nœud a été créé
        owner: ParcelId,
    },
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Pillar => write!(f, "pillar"),
            NodeKind::ServicePoint => write!(f, "service point"),
            NodeKind::Potential { .. } => write!(f, "potential"),
        }
    }
}

/// Un nœud de raccordement électrique, réel ou candidat
#[derive(Debug, Clone)]
pub struct ElectricalNode {
    /// Identifiant externe (pilier) ou généré (point de service)
    pub id: String,

    /// Nature du nœud
    pub kind: NodeKind,

    /// Position du nœud
    pub position: Point,

    /// Parcelles desservies. Pour un nœud non potentiel, cette liste ne fait
    /// que croître pendant la session.
    pub served: Vec<ParcelId>,

    /// Centroïdes des parcelles desservies, pour le tracé des liaisons
    pub centroids: HashMap<ParcelId, Point>,

    /// Implantation d'origine pour un nœud potentiel
    pub side: Option<Placement>,
}

impl ElectricalNode {
    /// Le nœud est-il spéculatif ?
    pub fn is_potential(&self) -> bool {
        matches!(self.kind, NodeKind::Potential { .. })
    }

    /// Le nœud dessert-il cette parcelle ?
    pub fn serves(&self, parcel_id: &str) -> bool {
        self.served.iter().any(|p| p == parcel_id)
    }
}

/// Étiquette d'affichage d'un nœud
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeLabel {
    /// Le nœud est dans l'emprise de la parcelle
    OnSite,
    /// Distance en ligne droite à la façade, en mètres
    Distance(f64),
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeLabel::OnSite => write!(f, "On Site"),
            NodeLabel::Distance(d) => write!(f, "{:.1} m", d),
        }
    }
}

/// État d'affichage d'un nœud autour de la sélection courante
#[derive(Debug, Clone)]
pub struct NodeDisplay {
    /// Identifiant du nœud
    pub node_id: String,

    /// Nature du nœud
    pub kind: NodeKind,

    /// Le nœud est-il le nœud principal de la sélection ?
    pub primary: bool,

    /// Étiquette à afficher
    pub label: NodeLabel,
}
