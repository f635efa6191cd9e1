//! Types d'erreurs pour le crate riverain

use thiserror::Error;

/// Erreurs du moteur de décision
///
/// Les échecs d'opérations géométriques (découpe, union, intersection vides)
/// ne passent jamais par ce type : ils sont absorbés localement et traités
/// comme "pas de résultat", conformément à la politique de dégradation.
#[derive(Debug, Error)]
pub enum RiverainError {
    /// Aucune parcelle sélectionnée
    #[error("No parcel selected")]
    NoSelection,

    /// Résultat issu d'une sélection périmée
    #[error("Stale selection: generation {token} superseded by {current}")]
    StaleSelection { token: u64, current: u64 },

    /// Parcelle invalide (identifiant, ring)
    #[error("Invalid parcel {id}: {reason}")]
    InvalidParcel { id: String, reason: String },

    /// Ligne limite invalide
    #[error("Invalid boundary line {id}: {reason}")]
    InvalidBoundaryLine { id: String, reason: String },

    /// Pilier invalide dans l'inventaire
    #[error("Invalid pillar {id}: {reason}")]
    InvalidPillar { id: String, reason: String },

    /// Entrée invalide pour la subdivision
    #[error("Subdivision error: {0}")]
    Subdivision(String),

    /// Nœud inconnu du registre
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// Requête de l'inventaire des piliers échouée
    #[error("Pillar query failed: {0}")]
    PillarQuery(String),
}

impl RiverainError {
    /// Crée une erreur de parcelle invalide avec contexte
    pub fn invalid_parcel(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParcel {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Crée une erreur de ligne limite invalide
    pub fn invalid_boundary_line(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBoundaryLine {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Crée une erreur de pilier invalide
    pub fn invalid_pillar(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPillar {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Crée une erreur de subdivision
    pub fn subdivision(reason: impl Into<String>) -> Self {
        Self::Subdivision(reason.into())
    }

    /// Crée une erreur de requête piliers
    pub fn pillar_query(reason: impl Into<String>) -> Self {
        Self::PillarQuery(reason.into())
    }
}
