//! Session de travail sur une parcelle
//!
//! La session est le point d'entrée de la bibliothèque : elle porte la
//! sélection courante, la machine de subdivision et le registre des nœuds.
//! Chaque changement de sélection incrémente une génération ; les appels
//! porteurs d'un jeton périmé sont rejetés au lieu d'écrire dans l'état d'une
//! autre sélection.

use geo::MultiPolygon;
use tracing::{debug, info};

use crate::classify::{self, Classified};
use crate::config::Tolerances;
use crate::error::RiverainError;
use crate::registry::{NodeRegistry, PillarSource};
use crate::setback;
use crate::subdivide::{ClickOutcome, Subdivision, SubdivisionState};
use crate::types::{BoundaryLine, ElectricalNode, FrontageLine, NodeDisplay, Parcel, SubPolygon};

/// Jeton de validité d'une sélection.
///
/// Émis par [`Session::select`], exigé par toute opération qui modifie l'état
/// de la sélection. Un jeton d'une génération antérieure est refusé.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionToken(u64);

/// Sélection active
#[derive(Debug, Clone)]
pub struct Selection {
    pub parcel: Parcel,
    pub classified: Classified,
}

/// Résultat de la finalisation d'une subdivision
#[derive(Debug)]
pub struct SubdivisionOutcome {
    /// Les morceaux issus de la découpe, avec leur façade héritée
    pub sub_polygons: Vec<SubPolygon>,

    /// Nœud attribué à chaque morceau, dans le même ordre
    pub assignments: Vec<(String, Option<ElectricalNode>)>,

    /// État d'affichage combiné, calculé une seule fois sur l'ensemble des
    /// façades héritées
    pub displays: Vec<NodeDisplay>,
}

/// Session de décision sur une parcelle
#[derive(Debug, Default)]
pub struct Session {
    generation: u64,
    current: Option<Selection>,
    subdivision: Subdivision,
    sub_polygons: Vec<SubPolygon>,
    registry: NodeRegistry,
    tolerances: Tolerances,
}

impl Session {
    pub fn new(tolerances: Tolerances) -> Self {
        Session {
            tolerances,
            ..Session::default()
        }
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    /// Sélection active, si la session en a une
    pub fn selection(&self) -> Option<&Selection> {
        self.current.as_ref()
    }

    /// Sous-polygones de la dernière subdivision finalisée
    pub fn sub_polygons(&self) -> &[SubPolygon] {
        &self.sub_polygons
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Jeton de la sélection active
    pub fn token(&self) -> Result<SelectionToken, RiverainError> {
        if self.current.is_none() {
            return Err(RiverainError::NoSelection);
        }
        Ok(SelectionToken(self.generation))
    }

    pub fn is_current(&self, token: SelectionToken) -> bool {
        self.current.is_some() && token.0 == self.generation
    }

    /// Sélectionne une parcelle et classe ses limites.
    ///
    /// Toute sélection remplace la précédente : la subdivision en cours est
    /// abandonnée, les sous-polygones oubliés et les nœuds potentiels purgés.
    pub fn select(
        &mut self,
        parcel: Parcel,
        lines: Vec<BoundaryLine>,
    ) -> Result<SelectionToken, RiverainError> {
        self.generation += 1;
        self.subdivision.clear();
        self.sub_polygons.clear();
        self.registry.remove_all_potential();

        let classified = classify::classify(lines, &parcel.geometry, &self.tolerances);
        info!(
            parcel = %parcel.id,
            frontage = classified.frontage.len(),
            interior = classified.interior.len(),
            "Parcel selected"
        );
        self.current = Some(Selection { parcel, classified });
        Ok(SelectionToken(self.generation))
    }

    /// Abandonne la sélection courante
    pub fn deselect(&mut self) {
        if self.current.take().is_some() {
            debug!("Selection cleared");
        }
        self.generation += 1;
        self.subdivision.clear();
        self.sub_polygons.clear();
        self.registry.remove_all_potential();
    }

    fn checked(&self, token: SelectionToken) -> Result<&Selection, RiverainError> {
        let selection = self.current.as_ref().ok_or(RiverainError::NoSelection)?;
        if token.0 != self.generation {
            return Err(RiverainError::StaleSelection {
                token: token.0,
                current: self.generation,
            });
        }
        Ok(selection)
    }

    /// Zone de recul de la sélection courante
    pub fn setback_zone(&self, token: SelectionToken) -> Result<Option<MultiPolygon>, RiverainError> {
        let selection = self.checked(token)?;
        Ok(setback::setback_zone(
            &selection.parcel.geometry,
            &selection.classified.frontage,
            &self.tolerances,
        ))
    }

    /// Attribue un nœud électrique à la parcelle sélectionnée
    pub async fn assign_node<S: PillarSource>(
        &mut self,
        token: SelectionToken,
        source: &S,
    ) -> Result<Option<ElectricalNode>, RiverainError> {
        let selection = self.checked(token)?.clone();
        self.registry
            .assign(
                &selection.parcel.id,
                &selection.parcel.geometry,
                &selection.classified.frontage,
                source,
                &self.tolerances,
            )
            .await
    }

    /// État d'affichage des nœuds autour de la sélection courante
    pub fn visualization(
        &self,
        token: SelectionToken,
        primary: &[String],
    ) -> Result<Vec<NodeDisplay>, RiverainError> {
        let selection = self.checked(token)?;
        Ok(self.registry.update_visualization(
            &selection.parcel.geometry,
            &selection.classified.frontage,
            primary,
            &self.tolerances,
        ))
    }

    /// Passe en mode subdivision.
    ///
    /// Refusé si la parcelle n'a aucune façade : les morceaux n'auraient rien
    /// à hériter et aucun nœud ne pourrait leur être attribué.
    pub fn enable_subdivision(&mut self, token: SelectionToken) -> Result<(), RiverainError> {
        let selection = self.checked(token)?;
        if selection.classified.frontage.is_empty() {
            return Err(RiverainError::subdivision(
                "parcel has no frontage to inherit",
            ));
        }
        self.subdivision.enable()
    }

    pub fn subdivision_state(&self) -> SubdivisionState {
        self.subdivision.state()
    }

    /// Enregistre un clic de dessin de subdivision
    pub fn subdivision_click(
        &mut self,
        token: SelectionToken,
        click: geo::Point,
    ) -> Result<ClickOutcome, RiverainError> {
        let selection = self.checked(token)?.clone();
        self.subdivision
            .add_click(click, &selection.parcel.geometry, &self.tolerances)
    }

    /// Finalise la subdivision : découpe, propagation de façade, attribution
    /// d'un nœud par morceau, puis un seul calcul d'affichage sur l'ensemble
    /// des façades héritées.
    pub async fn complete_subdivision<S: PillarSource>(
        &mut self,
        token: SelectionToken,
        source: &S,
    ) -> Result<SubdivisionOutcome, RiverainError> {
        let selection = self.checked(token)?.clone();
        let subs = self.subdivision.complete(
            &selection.parcel,
            &selection.classified.frontage,
            &self.tolerances,
        )?;

        let mut assignments = Vec::with_capacity(subs.len());
        for sub in &subs {
            let node = self
                .registry
                .assign(&sub.id, &sub.geometry, &sub.frontage, source, &self.tolerances)
                .await?;
            assignments.push((sub.id.clone(), node));
        }

        let combined: Vec<FrontageLine> =
            subs.iter().flat_map(|s| s.frontage.iter().cloned()).collect();
        let primary: Vec<String> = assignments
            .iter()
            .filter_map(|(_, node)| node.as_ref().map(|n| n.id.clone()))
            .collect();
        let displays = self.registry.update_visualization(
            &selection.parcel.geometry,
            &combined,
            &primary,
            &self.tolerances,
        );

        info!(
            parcel = %selection.parcel.id,
            pieces = subs.len(),
            nodes = primary.len(),
            "Subdivision completed"
        );
        self.sub_polygons = subs.clone();
        Ok(SubdivisionOutcome {
            sub_polygons: subs,
            assignments,
            displays,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NoPillars;
    use crate::types::UsageCode;
    use geo::{Coord, LineString, Point, Polygon};

    fn parcel(id: &str, size: f64) -> Parcel {
        Parcel {
            id: id.to_string(),
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
            area: Some(size * size),
        }
    }

    fn south_line(id: &str, size: f64) -> BoundaryLine {
        BoundaryLine {
            id: id.to_string(),
            path: LineString::new(vec![Coord { x: 0.0, y: 0.0 }, Coord { x: size, y: 0.0 }]),
            usage: UsageCode::Frontage,
        }
    }

    #[test]
    fn test_token_requires_selection() {
        let session = Session::new(Tolerances::default());
        assert!(matches!(session.token(), Err(RiverainError::NoSelection)));
    }

    #[test]
    fn test_stale_token_is_rejected() {
        let mut session = Session::new(Tolerances::default());
        let old = session
            .select(parcel("1", 100.0), vec![south_line("l1", 100.0)])
            .unwrap();
        let fresh = session
            .select(parcel("2", 100.0), vec![south_line("l2", 100.0)])
            .unwrap();

        assert!(!session.is_current(old));
        assert!(session.is_current(fresh));
        assert!(matches!(
            session.setback_zone(old),
            Err(RiverainError::StaleSelection { .. })
        ));
        assert!(session.setback_zone(fresh).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reselection_purges_potential_nodes() {
        let mut session = Session::new(Tolerances::default());
        let token = session
            .select(parcel("1", 100.0), vec![south_line("l1", 100.0)])
            .unwrap();
        let node = session.assign_node(token, &NoPillars).await.unwrap().unwrap();
        assert!(node.is_potential());
        assert_eq!(session.registry().nodes().len(), 1);

        session
            .select(parcel("2", 100.0), vec![south_line("l2", 100.0)])
            .unwrap();
        assert!(session.registry().nodes().is_empty());
    }

    #[tokio::test]
    async fn test_stale_token_cannot_assign() {
        let mut session = Session::new(Tolerances::default());
        let old = session
            .select(parcel("1", 100.0), vec![south_line("l1", 100.0)])
            .unwrap();
        session.deselect();

        let result = session.assign_node(old, &NoPillars).await;
        assert!(matches!(result, Err(RiverainError::NoSelection)));
    }

    #[test]
    fn test_subdivision_requires_frontage() {
        let mut session = Session::new(Tolerances::default());
        // Limite intérieure uniquement
        let mut line = south_line("l1", 100.0);
        line.usage = UsageCode::Interior;
        let token = session.select(parcel("1", 100.0), vec![line]).unwrap();

        assert!(session.enable_subdivision(token).is_err());
        assert_eq!(session.subdivision_state(), SubdivisionState::Idle);
    }

    #[tokio::test]
    async fn test_full_subdivision_flow() {
        let mut session = Session::new(Tolerances::default());
        let token = session
            .select(parcel("1", 100.0), vec![south_line("l1", 100.0)])
            .unwrap();

        session.enable_subdivision(token).unwrap();
        session
            .subdivision_click(token, Point::new(-10.0, 50.0))
            .unwrap();
        let second = session
            .subdivision_click(token, Point::new(110.0, 50.0))
            .unwrap();
        assert!(second.finalized.is_some());

        let outcome = session
            .complete_subdivision(token, &NoPillars)
            .await
            .unwrap();
        assert_eq!(outcome.sub_polygons.len(), 2);
        assert_eq!(outcome.assignments.len(), 2);
        assert_eq!(session.sub_polygons().len(), 2);
        assert_eq!(session.subdivision_state(), SubdivisionState::Idle);

        // Seule la moitié sud hérite d'une façade, elle seule reçoit un nœud
        let with_node: Vec<_> = outcome
            .assignments
            .iter()
            .filter(|(_, n)| n.is_some())
            .collect();
        assert_eq!(with_node.len(), 1);
        assert_eq!(outcome.displays.len(), 1);
        assert!(outcome.displays[0].primary);
    }
}
