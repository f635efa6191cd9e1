//! Seuils de distance du moteur

use serde::{Deserialize, Serialize};

/// Seuils de distance, tous en mètres (le CRS de travail est métrique)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Distance maximale des extrémités d'une ligne limite au contour de la
    /// parcelle pour être retenue (compense le désalignement entre couches)
    pub endpoint_snap: f64,

    /// Distance maximale des extrémités d'un bord à une façade de référence
    /// pour hériter de ses attributs
    pub edge_match: f64,

    /// Distance d'accrochage d'un clic intérieur au contour de la parcelle
    pub boundary_snap: f64,

    /// Rayon de partage d'un nœud de raccordement
    pub sharing: f64,

    /// Rayon de recherche étendu pour l'affichage des nœuds
    pub visual_radius: f64,

    /// Profondeur de la zone de recul depuis la façade
    pub setback: f64,

    /// Décalage perpendiculaire d'implantation d'un nœud potentiel
    pub placement_inset: f64,

    /// Délai maximal d'une requête de l'inventaire des piliers, en secondes.
    /// Au-delà, la requête est traitée comme "aucun pilier trouvé".
    pub pillar_timeout_secs: u64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            endpoint_snap: 1.5,
            edge_match: 2.0,
            boundary_snap: 5.0,
            sharing: 30.0,
            visual_radius: 400.0,
            setback: 10.0,
            placement_inset: 10.0,
            pillar_timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let tol = Tolerances::default();
        assert_eq!(tol.endpoint_snap, 1.5);
        assert_eq!(tol.edge_match, 2.0);
        assert_eq!(tol.boundary_snap, 5.0);
        assert_eq!(tol.sharing, 30.0);
        assert_eq!(tol.visual_radius, 400.0);
        assert_eq!(tol.setback, 10.0);
        assert_eq!(tol.placement_inset, 10.0);
    }
}
