//! Définition et implémentation des commandes CLI
//!
//! - `frontage` : sélection d'une parcelle, classement, zone de recul,
//!   attribution d'un nœud
//! - `subdivide` : rejoue un scénario de clics puis finalise la subdivision

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use geo::{Area, Point};
use serde::Deserialize;
use tracing::info;

use riverain::normalize;
use riverain::{Session, Tolerances};

use crate::report::SessionReport;
use crate::source::{Dataset, GeojsonPillars};

#[derive(Args)]
pub struct CommonArgs {
    /// Couche GeoJSON des parcelles
    #[arg(short, long)]
    pub parcels: PathBuf,

    /// Couche GeoJSON des limites cadastrales
    #[arg(short, long)]
    pub boundaries: PathBuf,

    /// Couche GeoJSON des piliers (optionnelle)
    #[arg(long)]
    pub pillars: Option<PathBuf>,

    /// Identifiant de la parcelle à sélectionner
    #[arg(short, long)]
    pub id: String,

    /// SRID des couches d'entrée (défaut : 4326 / WGS84)
    #[arg(long, default_value_t = 4326)]
    pub srid: u32,

    /// Fichier JSON de tolérances (défaut : valeurs intégrées)
    #[arg(long)]
    pub tolerances: Option<PathBuf>,

    /// Écrire le rapport de session en JSON
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify boundaries and assign an electrical node to one parcel
    Frontage(CommonArgs),

    /// Replay a subdivision click scenario and assign nodes per sub-polygon
    Subdivide(SubdivideArgs),
}

#[derive(Args)]
pub struct SubdivideArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Scénario JSON : liste de clics [x, y] dans le CRS des couches
    #[arg(short, long)]
    pub scenario: PathBuf,
}

/// Scénario de subdivision rejoué par `subdivide`
#[derive(Debug, Deserialize)]
struct Scenario {
    /// Clics dans l'ordre du dessin
    clicks: Vec<[f64; 2]>,
}

fn parse_scenario(raw: &str) -> Result<Scenario> {
    let scenario: Scenario = serde_json::from_str(raw).context("Invalid scenario")?;
    if scenario.clicks.is_empty() {
        anyhow::bail!("Scenario has no clicks");
    }
    Ok(scenario)
}

fn load_tolerances(path: Option<&Path>) -> Result<Tolerances> {
    match path {
        None => Ok(Tolerances::default()),
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Invalid tolerances in {}", path.display()))
        }
    }
}

fn validate_parcel_id(id: &str) -> Result<()> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        anyhow::bail!("Invalid parcel id '{id}': expected alphanumeric identifier");
    }
    Ok(())
}

/// Exécute la commande frontage
pub async fn cmd_frontage(args: CommonArgs) -> Result<()> {
    validate_parcel_id(&args.id)?;
    let tolerances = load_tolerances(args.tolerances.as_deref())?;
    let started_at = std::time::Instant::now();

    let dataset = Dataset::load(
        &args.parcels,
        &args.boundaries,
        args.pillars.as_deref(),
        args.srid,
    )?;
    let mut report = SessionReport::new(&args.id);
    report.parcels_loaded = dataset.parcels.len();
    report.boundaries_loaded = dataset.boundaries.len();
    report.pillars_loaded = dataset.pillars.len();

    let source = GeojsonPillars::new(dataset.pillars.clone(), tolerances.pillar_timeout_secs);
    let pillar_timeout = tolerances.pillar_timeout_secs;
    let mut session = Session::new(tolerances);

    let parcel = normalize::parcel_from_raw(dataset.parcel_by_id(&args.id)?)?;
    let lines = normalize_boundaries(&dataset, &mut report);

    let token = session.select(parcel, lines)?;
    let selection = session.selection().context("selection just made")?;
    report.frontage_lines = selection.classified.frontage.len();
    report.interior_lines = selection.classified.interior.len();
    report.other_lines = selection.classified.other.len();

    println!("=== Frontage {} ===", args.id);
    println!("Working CRS: {:?}", dataset.crs.epsg());
    println!("Pillar timeout: {}s", pillar_timeout);
    println!(
        "Boundaries: {} frontage, {} interior, {} other",
        report.frontage_lines, report.interior_lines, report.other_lines
    );
    for line in &selection.classified.frontage {
        println!("  frontage {} ({} points)", line.source_id, line.path.0.len());
    }

    match session.setback_zone(token)? {
        Some(zone) => {
            report.setback_area_m2 = Some(zone.unsigned_area());
            println!("Setback zone: {:.1} m²", zone.unsigned_area());
        }
        None => println!("Setback zone: none"),
    }

    match session.assign_node(token, &source).await? {
        Some(node) => {
            report.record_assignment(&node);
            println!("Node: {} ({})", node.id, node.kind);
            let displays = session.visualization(token, &[node.id.clone()])?;
            for display in &displays {
                let marker = if display.primary { "*" } else { " " };
                println!("  {} {} {}: {}", marker, display.node_id, display.kind, display.label);
            }
            report.nodes_displayed = displays.len();
        }
        None => println!("Node: none (no frontage)"),
    }

    report.set_duration(started_at.elapsed());
    report.finalize();
    report.display();
    if let Some(path) = &args.report {
        report.save_to_file(path)?;
        info!(path = %path.display(), "Report written");
    }

    Ok(())
}

/// Exécute la commande subdivide
pub async fn cmd_subdivide(args: SubdivideArgs) -> Result<()> {
    validate_parcel_id(&args.common.id)?;
    let tolerances = load_tolerances(args.common.tolerances.as_deref())?;
    let started_at = std::time::Instant::now();

    let raw = std::fs::read_to_string(&args.scenario)
        .with_context(|| format!("Cannot read {}", args.scenario.display()))?;
    let scenario =
        parse_scenario(&raw).with_context(|| format!("In {}", args.scenario.display()))?;

    let dataset = Dataset::load(
        &args.common.parcels,
        &args.common.boundaries,
        args.common.pillars.as_deref(),
        args.common.srid,
    )?;
    let mut report = SessionReport::new(&args.common.id);
    report.parcels_loaded = dataset.parcels.len();
    report.boundaries_loaded = dataset.boundaries.len();
    report.pillars_loaded = dataset.pillars.len();

    let source = GeojsonPillars::new(dataset.pillars.clone(), tolerances.pillar_timeout_secs);
    let mut session = Session::new(tolerances);

    let parcel = normalize::parcel_from_raw(dataset.parcel_by_id(&args.common.id)?)?;
    let lines = normalize_boundaries(&dataset, &mut report);

    let token = session.select(parcel, lines)?;
    let selection = session.selection().context("selection just made")?;
    report.frontage_lines = selection.classified.frontage.len();
    report.interior_lines = selection.classified.interior.len();
    report.other_lines = selection.classified.other.len();

    session.enable_subdivision(token)?;
    println!("=== Subdivide {} ===", args.common.id);
    println!("Clicks: {}", scenario.clicks.len());

    for [x, y] in &scenario.clicks {
        let outcome = session.subdivision_click(token, Point::new(*x, *y))?;
        println!(
            "  click ({x:.1}, {y:.1}) -> {}{}",
            outcome.point.kind,
            if outcome.point.snapped { " (snapped)" } else { "" }
        );
        if let Some(line) = outcome.finalized {
            println!("  line completed: {}", line.label);
            report.subdivision_lines += 1;
        }
    }

    let outcome = session.complete_subdivision(token, &source).await?;
    report.sub_polygons = outcome.sub_polygons.len();
    report.nodes_displayed = outcome.displays.len();

    println!("\nSub-polygons: {}", outcome.sub_polygons.len());
    for sub in &outcome.sub_polygons {
        println!(
            "  {}: {:.1} m², {} frontage line(s)",
            sub.id,
            sub.geometry.unsigned_area(),
            sub.frontage.len()
        );
    }
    for (sub_id, node) in &outcome.assignments {
        match node {
            Some(node) => {
                report.record_assignment(node);
                println!("  {} -> {} ({})", sub_id, node.id, node.kind);
            }
            None => println!("  {} -> no node (no inherited frontage)", sub_id),
        }
    }
    for display in &outcome.displays {
        let marker = if display.primary { "*" } else { " " };
        println!("  {} {} {}: {}", marker, display.node_id, display.kind, display.label);
    }

    report.set_duration(started_at.elapsed());
    report.finalize();
    report.display();
    if let Some(path) = &args.common.report {
        report.save_to_file(path)?;
        info!(path = %path.display(), "Report written");
    }

    Ok(())
}

/// Normalise la couche de limites, en comptant les features rejetées
fn normalize_boundaries(
    dataset: &Dataset,
    report: &mut SessionReport,
) -> Vec<riverain::BoundaryLine> {
    let mut lines = Vec::new();
    for feature in &dataset.boundaries {
        match normalize::boundary_lines_from_raw(feature) {
            Ok(mut normalized) => lines.append(&mut normalized),
            Err(e) => report.record_warning(&e.to_string()),
        }
    }
    lines
}
