//! # riverain
//!
//! Moteur de décision cadastral : propagation de façade, subdivision de
//! parcelle et partage de nœuds de raccordement électrique.
//!
//! ## Features
//!
//! - Classement des limites cadastrales (façade / intérieur / autre)
//! - Zone de recul le long des façades
//! - Subdivision interactive par clics, avec accrochage au contour
//! - Héritage de façade par correspondance d'extrémités
//! - Registre de nœuds électriques : partage, piliers, points potentiels
//! - Sessions à génération, contre les rappels périmés
//!
//! ## Usage
//!
//! ```no_run
//! use riverain::{NoPillars, Session, Tolerances};
//! # use riverain::{Parcel, BoundaryLine};
//! # async fn demo(parcel: Parcel, lines: Vec<BoundaryLine>) -> Result<(), riverain::RiverainError> {
//! let mut session = Session::new(Tolerances::default());
//! let token = session.select(parcel, lines)?;
//! let zone = session.setback_zone(token)?;
//! let node = session.assign_node(token, &NoPillars).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Toutes les géométries sont supposées exprimées dans un CRS métrique ; voir
//! [`geom::project`] pour la reprojection des sources géographiques.

pub mod classify;
pub mod config;
pub mod error;
pub mod geom;
pub mod matcher;
pub mod normalize;
pub mod registry;
pub mod session;
pub mod setback;
pub mod subdivide;
pub mod types;

pub use config::Tolerances;
pub use error::RiverainError;
pub use registry::{NoPillars, NodeRegistry, Pillar, PillarSource};
pub use session::{SelectionToken, Session, SubdivisionOutcome};
pub use types::{
    BoundaryLine, ElectricalNode, FrontageLine, NodeDisplay, NodeKind, NodeLabel, Parcel,
    SubPolygon, SubdivisionLine, SubdivisionPoint, UsageCode,
};
