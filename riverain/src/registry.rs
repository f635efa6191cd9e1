//! Registre des nœuds de raccordement électrique
//!
//! Magasin en mémoire, à portée de session, des piliers connus et des points
//! de service candidats. Décide du partage d'un nœud existant ou de la
//! création d'un nœud potentiel, et prépare l'état d'affichage.

use std::collections::HashMap;

use geo::{Centroid, Contains, Line, LineString, MultiPolygon, Point, Polygon};
use tracing::{debug, info, warn};

use crate::config::Tolerances;
use crate::error::RiverainError;
use crate::geom::{self, buffer};
use crate::types::{
    ElectricalNode, FrontageLine, LateralSide, NodeDisplay, NodeKind, NodeLabel, Placement,
    SegmentEnd,
};

/// Pilier issu de l'inventaire externe
#[derive(Debug, Clone)]
pub struct Pillar {
    /// Identifiant externe
    pub id: String,

    /// Position dans le CRS de travail
    pub position: Point,
}

/// Inventaire des piliers, interrogé par filtre spatial
///
/// La requête est asynchrone (service de features distant). Un échec est
/// dégradé en "aucun pilier trouvé" par le registre, jamais propagé.
pub trait PillarSource {
    /// Piliers dont la position intersecte la zone donnée
    fn pillars_within(
        &self,
        area: &MultiPolygon,
    ) -> impl std::future::Future<Output = Result<Vec<Pillar>, RiverainError>>;
}

/// Source vide, pour les sessions sans inventaire de piliers
#[derive(Debug, Default)]
pub struct NoPillars;

impl PillarSource for NoPillars {
    async fn pillars_within(&self, _area: &MultiPolygon) -> Result<Vec<Pillar>, RiverainError> {
        Ok(Vec::new())
    }
}

/// Registre des nœuds de la session
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: Vec<ElectricalNode>,
    next_candidate: u64,
}

impl NodeRegistry {
    /// Tous les nœuds connus
    pub fn nodes(&self) -> &[ElectricalNode] {
        &self.nodes
    }

    /// Nœud par identifiant
    pub fn node(&self, id: &str) -> Option<&ElectricalNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Nœud principal d'une parcelle : son nœud actif, à défaut son nœud
    /// potentiel
    pub fn primary_for(&self, parcel_id: &str) -> Option<&ElectricalNode> {
        self.nodes
            .iter()
            .find(|n| !n.is_potential() && n.serves(parcel_id))
            .or_else(|| {
                self.nodes.iter().find(
                    |n| matches!(&n.kind, NodeKind::Potential { owner } if owner == parcel_id),
                )
            })
    }

    /// Attribue un nœud à une parcelle (ou un sous-polygone) depuis sa façade.
    ///
    /// Retourne `None` uniquement si `frontage` est vide. Sinon, dans l'ordre :
    /// ré-attribution idempotente, partage du nœud connu le plus proche dans
    /// le rayon de partage, découverte de piliers dans la même zone, et en
    /// dernier recours création d'un nœud potentiel.
    pub async fn assign<S: PillarSource>(
        &mut self,
        parcel_id: &str,
        parcel: &Polygon,
        frontage: &[FrontageLine],
        source: &S,
        tol: &Tolerances,
    ) -> Result<Option<ElectricalNode>, RiverainError> {
        if frontage.is_empty() {
            return Ok(None);
        }

        // Ré-sélection idempotente : un nœud desservant déjà la parcelle est
        // rendu tel quel. Le nœud potentiel de la parcelle compte aussi, pour
        // qu'un double appel sans changement de sélection rende le même nœud.
        if let Some(existing) = self.nodes.iter().find(|n| {
            n.serves(parcel_id)
                && match &n.kind {
                    NodeKind::Potential { owner } => owner == parcel_id,
                    _ => true,
                }
        }) {
            return Ok(Some(existing.clone()));
        }

        let paths: Vec<LineString> = frontage.iter().map(|f| f.path.clone()).collect();
        let zone = buffer::buffer_lines(&paths, tol.sharing);

        // Meilleur nœud déjà connu dans la zone de partage (hors potentiels)
        let mut best: Option<(usize, f64)> = None;
        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_potential() || !zone.contains(&node.position) {
                continue;
            }
            let d = geom::distance_to_lines(node.position, &paths);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }

        // Piliers de l'inventaire dans la même zone ; les inconnus sont
        // enregistrés comme nœuds, puis concourent au même titre
        match source.pillars_within(&zone).await {
            Ok(pillars) => {
                for pillar in pillars {
                    if self.nodes.iter().any(|n| n.id == pillar.id) {
                        continue;
                    }
                    debug!(pillar = %pillar.id, "Registering pillar from inventory");
                    self.nodes.push(ElectricalNode {
                        id: pillar.id,
                        kind: NodeKind::Pillar,
                        position: pillar.position,
                        served: Vec::new(),
                        centroids: HashMap::new(),
                        side: None,
                    });
                    let i = self.nodes.len() - 1;
                    let d = geom::distance_to_lines(self.nodes[i].position, &paths);
                    if best.map_or(true, |(_, bd)| d < bd) {
                        best = Some((i, d));
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Pillar query failed, continuing without inventory");
            }
        }

        if let Some((i, d)) = best {
            let centroid = parcel.centroid();
            let node = &mut self.nodes[i];
            if !node.serves(parcel_id) {
                node.served.push(parcel_id.to_string());
            }
            if let Some(c) = centroid {
                node.centroids.insert(parcel_id.to_string(), c);
            }
            info!(node = %node.id, parcel = parcel_id, distance_m = d, "Sharing existing node");
            return Ok(Some(node.clone()));
        }

        // Aucun nœud partageable dans le rayon : nœud potentiel, après purge
        // de l'éventuel potentiel précédent de cette parcelle
        self.remove_potential_for(parcel_id);
        let node = self.create_potential(parcel_id, parcel, frontage, tol);
        Ok(Some(node))
    }

    /// Crée le nœud potentiel d'une parcelle.
    ///
    /// L'implantation retenue est toujours "premier segment, côté droit" ;
    /// choix fixe hérité du comportement documenté, à ne pas remplacer par
    /// une sélection au plus-proche-du-centroïde sans décision produit.
    fn create_potential(
        &mut self,
        parcel_id: &str,
        parcel: &Polygon,
        frontage: &[FrontageLine],
        tol: &Tolerances,
    ) -> ElectricalNode {
        let placement = Placement {
            end: SegmentEnd::Start,
            side: LateralSide::Right,
        };

        let position = match frontage[0].path.lines().next() {
            Some(segment) => placement_position(segment, placement, parcel, tol.placement_inset),
            // Tracé dégénéré : premier point brut
            None => frontage[0]
                .path
                .points()
                .next()
                .unwrap_or_else(|| Point::new(0.0, 0.0)),
        };

        self.next_candidate += 1;
        let id = format!("SP_{}", self.next_candidate);

        let mut centroids = HashMap::new();
        if let Some(c) = parcel.centroid() {
            centroids.insert(parcel_id.to_string(), c);
        }

        let node = ElectricalNode {
            id,
            kind: NodeKind::Potential {
                owner: parcel_id.to_string(),
            },
            position,
            served: vec![parcel_id.to_string()],
            centroids,
            side: Some(placement),
        };
        info!(node = %node.id, parcel = parcel_id, placement = %placement, "Created potential service point");
        self.nodes.push(node.clone());
        node
    }

    /// Supprime le nœud potentiel de cette parcelle (au plus un à la fois)
    pub fn remove_potential_for(&mut self, parcel_id: &str) {
        self.nodes
            .retain(|n| !matches!(&n.kind, NodeKind::Potential { owner } if owner == parcel_id));
    }

    /// Supprime tous les nœuds potentiels. Appelé à chaque changement de
    /// sélection : un nœud potentiel n'a de sens que pendant que sa parcelle
    /// est la sélection active.
    pub fn remove_all_potential(&mut self) {
        self.nodes.retain(|n| !n.is_potential());
    }

    /// Confirme un nœud potentiel en point de service actif
    pub fn confirm(&mut self, node_id: &str) -> Result<(), RiverainError> {
        match self.nodes.iter_mut().find(|n| n.id == node_id) {
            Some(node) if node.is_potential() => {
                info!(node = %node.id, "Potential service point confirmed");
                node.kind = NodeKind::ServicePoint;
                Ok(())
            }
            Some(_) => Ok(()),
            None => Err(RiverainError::UnknownNode(node_id.to_string())),
        }
    }

    /// Prépare l'affichage des nœuds autour de la façade active.
    ///
    /// La recherche est restreinte au rayon étendu (`visual_radius`), le nœud
    /// principal restant toujours inclus ; un nœud n'est rendu que s'il tombe
    /// dans le rayon de partage ou s'il est principal. Les nœuds dans
    /// l'emprise de la parcelle sont étiquetés "On Site", les autres portent
    /// leur distance à la façade.
    pub fn update_visualization(
        &self,
        parcel: &Polygon,
        frontage: &[FrontageLine],
        primary: &[String],
        tol: &Tolerances,
    ) -> Vec<NodeDisplay> {
        let paths: Vec<LineString> = frontage.iter().map(|f| f.path.clone()).collect();
        let mut out = Vec::new();

        for node in &self.nodes {
            let is_primary = primary.iter().any(|id| *id == node.id);
            let d = geom::distance_to_lines(node.position, &paths);

            // Portée de recherche, puis critère de rendu
            if d > tol.visual_radius && !is_primary {
                continue;
            }
            if d > tol.sharing && !is_primary {
                continue;
            }

            let label = if parcel.contains(&node.position) {
                NodeLabel::OnSite
            } else {
                NodeLabel::Distance(d)
            };

            out.push(NodeDisplay {
                node_id: node.id.clone(),
                kind: node.kind.clone(),
                primary: is_primary,
                label,
            });
        }

        out
    }
}

/// Position d'implantation sur le premier segment de façade.
///
/// Les candidats sont les deux extrémités du segment croisées avec les deux
/// côtés perpendiculaires, décalés de `inset` et contrôlés par inclusion dans
/// la parcelle, l'implantation demandée en tête. Si aucun candidat ne tombe
/// dans la parcelle, repli sur le point d'extrémité brut.
fn placement_position(segment: Line, placement: Placement, parcel: &Polygon, inset: f64) -> Point {
    let end_point = |end: SegmentEnd| match end {
        SegmentEnd::Start => Point::from(segment.start),
        SegmentEnd::End => Point::from(segment.end),
    };

    let mut candidates = vec![placement];
    for end in [SegmentEnd::Start, SegmentEnd::End] {
        for side in [LateralSide::Right, LateralSide::Left] {
            let candidate = Placement { end, side };
            if candidate != placement {
                candidates.push(candidate);
            }
        }
    }

    for candidate in candidates {
        let offset = geom::offset_perpendicular(
            segment,
            end_point(candidate.end),
            candidate.side == LateralSide::Right,
            inset,
        );
        if parcel.contains(&offset) {
            return offset;
        }
    }

    end_point(placement.end)
}
