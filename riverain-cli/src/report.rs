//! Rapport de session avec graceful degradation
//!
//! Collecte les compteurs et avertissements d'une exécution (classement,
//! subdivision, attribution de nœuds) et les affiche ou les sérialise.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use riverain::{ElectricalNode, NodeKind};

/// Statut global de la session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionStatus {
    /// Exécution complète sans avertissement
    Success,
    /// Exécution complète avec avertissements
    PartialSuccess,
    /// Aucune décision produite
    Failed,
}

/// Rapport complet d'une session
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    /// Identifiant de la parcelle sélectionnée
    pub parcel_id: String,
    /// Durée de l'exécution
    pub duration_secs: f64,
    /// Statut global
    pub status: SessionStatus,

    // Compteurs de chargement
    pub parcels_loaded: usize,
    pub boundaries_loaded: usize,
    pub pillars_loaded: usize,

    // Compteurs de classement
    pub frontage_lines: usize,
    pub interior_lines: usize,
    pub other_lines: usize,

    /// Surface de la zone de recul, si calculée
    pub setback_area_m2: Option<f64>,

    // Compteurs de subdivision
    pub subdivision_lines: usize,
    pub sub_polygons: usize,

    // Compteurs de nœuds
    pub nodes_shared: usize,
    pub nodes_created: usize,
    pub nodes_displayed: usize,

    /// Avertissements non fatals
    pub warnings: Vec<String>,
}

impl SessionReport {
    /// Crée un rapport pour une parcelle
    pub fn new(parcel_id: &str) -> Self {
        Self {
            parcel_id: parcel_id.to_string(),
            duration_secs: 0.0,
            status: SessionStatus::Success,
            parcels_loaded: 0,
            boundaries_loaded: 0,
            pillars_loaded: 0,
            frontage_lines: 0,
            interior_lines: 0,
            other_lines: 0,
            setback_area_m2: None,
            subdivision_lines: 0,
            sub_polygons: 0,
            nodes_shared: 0,
            nodes_created: 0,
            nodes_displayed: 0,
            warnings: Vec::new(),
        }
    }

    /// Comptabilise un nœud attribué selon sa nature
    pub fn record_assignment(&mut self, node: &ElectricalNode) {
        match node.kind {
            NodeKind::Potential { .. } => self.nodes_created += 1,
            NodeKind::Pillar | NodeKind::ServicePoint => self.nodes_shared += 1,
        }
    }

    /// Enregistre un avertissement
    pub fn record_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    /// Définit la durée de l'exécution
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        let has_decisions = self.frontage_lines + self.interior_lines + self.other_lines > 0
            || self.sub_polygons > 0
            || self.nodes_shared + self.nodes_created > 0;

        self.status = if !has_decisions {
            SessionStatus::Failed
        } else if self.warnings.is_empty() {
            SessionStatus::Success
        } else {
            SessionStatus::PartialSuccess
        };
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("SESSION REPORT - Parcel {}", self.parcel_id);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- LAYERS ---");
        println!(
            "Parcels: {}, boundaries: {}, pillars: {}",
            self.parcels_loaded, self.boundaries_loaded, self.pillars_loaded
        );

        println!("\n--- CLASSIFICATION ---");
        println!(
            "Frontage: {}, interior: {}, other: {}",
            self.frontage_lines, self.interior_lines, self.other_lines
        );
        if let Some(area) = self.setback_area_m2 {
            println!("Setback zone: {:.1} m²", area);
        }

        if self.sub_polygons > 0 {
            println!("\n--- SUBDIVISION ---");
            println!(
                "Lines drawn: {}, sub-polygons: {}",
                self.subdivision_lines, self.sub_polygons
            );
        }

        println!("\n--- NODES ---");
        println!(
            "Shared: {}, created: {}, displayed: {}",
            self.nodes_shared, self.nodes_created, self.nodes_displayed
        );

        if !self.warnings.is_empty() {
            println!("\n--- WARNINGS ({}) ---", self.warnings.len());
            for w in self.warnings.iter().take(10) {
                println!("  {}", w);
            }
            if self.warnings.len() > 10 {
                println!("  ... and {} more", self.warnings.len() - 10);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{}: {} frontage, {} sub-polygons, {} shared, {} created, {} warnings",
            self.parcel_id,
            self.frontage_lines,
            self.sub_polygons,
            self.nodes_shared,
            self.nodes_created,
            self.warnings.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;
    use std::collections::HashMap;

    fn node(kind: NodeKind) -> ElectricalNode {
        ElectricalNode {
            id: "N1".to_string(),
            kind,
            position: Point::new(0.0, 0.0),
            served: vec!["1".to_string()],
            centroids: HashMap::new(),
            side: None,
        }
    }

    #[test]
    fn test_record_assignment_buckets() {
        let mut report = SessionReport::new("1");
        report.record_assignment(&node(NodeKind::Pillar));
        report.record_assignment(&node(NodeKind::ServicePoint));
        report.record_assignment(&node(NodeKind::Potential {
            owner: "1".to_string(),
        }));

        assert_eq!(report.nodes_shared, 2);
        assert_eq!(report.nodes_created, 1);
    }

    #[test]
    fn test_finalize_success() {
        let mut report = SessionReport::new("1");
        report.frontage_lines = 2;
        report.finalize();
        assert_eq!(report.status, SessionStatus::Success);
    }

    #[test]
    fn test_finalize_partial_success() {
        let mut report = SessionReport::new("1");
        report.frontage_lines = 2;
        report.record_warning("degenerate boundary skipped");
        report.finalize();
        assert_eq!(report.status, SessionStatus::PartialSuccess);
    }

    #[test]
    fn test_finalize_failed_without_decisions() {
        let mut report = SessionReport::new("1");
        report.finalize();
        assert_eq!(report.status, SessionStatus::Failed);
    }

    #[test]
    fn test_summary() {
        let mut report = SessionReport::new("42");
        report.frontage_lines = 3;
        report.nodes_created = 1;
        let summary = report.summary();
        assert!(summary.contains("42"));
        assert!(summary.contains("3 frontage"));
        assert!(summary.contains("1 created"));
    }
}
