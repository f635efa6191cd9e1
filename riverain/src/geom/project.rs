//! Reprojection vers le CRS de travail métrique
//!
//! Toute l'arithmétique de distance du moteur suppose un CRS projeté en
//! mètres. Les données arrivent le plus souvent en WGS84 (EPSG:4326) ou en
//! Web Mercator (EPSG:3857) ; ce module les projette une seule fois, à la
//! frontière de normalisation, vers la zone UTM déduite des données.
//! Les données déjà métriques passent telles quelles.

use geo::{Coord, LineString, Point, Polygon};

/// Ellipsoïde WGS84
pub struct Wgs84;

impl Wgs84 {
    /// Demi-grand axe (rayon équatorial) en mètres
    pub const A: f64 = 6378137.0;

    /// Aplatissement
    pub const F: f64 = 1.0 / 298.257223563;

    /// Première excentricité au carré
    pub const E2: f64 = 2.0 * Self::F - Self::F * Self::F;

    /// Deuxième excentricité au carré
    pub const EP2: f64 = Self::E2 / (1.0 - Self::E2);
}

/// Point en coordonnées géographiques (radians)
#[derive(Debug, Clone, Copy)]
pub struct Geographic {
    /// Longitude en radians
    pub lon: f64,
    /// Latitude en radians
    pub lat: f64,
}

impl Geographic {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Crée depuis des degrés
    pub fn from_degrees(lon_deg: f64, lat_deg: f64) -> Self {
        Self {
            lon: lon_deg.to_radians(),
            lat: lat_deg.to_radians(),
        }
    }

    /// Convertit en degrés
    pub fn to_degrees(self) -> (f64, f64) {
        (self.lon.to_degrees(), self.lat.to_degrees())
    }
}

/// CRS des données d'entrée
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceCrs {
    /// EPSG:4326, degrés décimaux
    Wgs84,
    /// EPSG:3857, mètres sphériques
    WebMercator,
    /// Déjà projeté en mètres, aucune transformation
    Metric,
}

impl SourceCrs {
    /// Déduit le CRS source d'un code EPSG (tout code non géographique connu
    /// est traité comme métrique)
    pub fn from_epsg(epsg: u32) -> Self {
        match epsg {
            4326 => SourceCrs::Wgs84,
            3857 => SourceCrs::WebMercator,
            _ => SourceCrs::Metric,
        }
    }
}

/// CRS de travail du moteur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkingCrs {
    /// Zone UTM déduite des données
    Utm { zone: u32, south: bool },
    /// Les données source sont déjà métriques, conservées telles quelles
    Source,
}

impl WorkingCrs {
    /// Déduit la zone UTM d'un échantillon lon/lat en degrés
    pub fn from_sample(lon_deg: f64, lat_deg: f64) -> Self {
        let zone = (((lon_deg + 180.0) / 6.0).floor() as i64).rem_euclid(60) as u32 + 1;
        WorkingCrs::Utm {
            zone,
            south: lat_deg < 0.0,
        }
    }

    /// Déduit le CRS de travail d'une coordonnée échantillon dans le CRS source
    pub fn from_source_sample(sample: Coord, source: SourceCrs) -> Self {
        match source {
            SourceCrs::Wgs84 => Self::from_sample(sample.x, sample.y),
            SourceCrs::WebMercator => {
                let (lon, lat) = web_mercator_to_geographic(sample.x, sample.y).to_degrees();
                Self::from_sample(lon, lat)
            }
            SourceCrs::Metric => WorkingCrs::Source,
        }
    }

    /// Code EPSG du CRS de travail, si connu
    pub fn epsg(&self) -> Option<u32> {
        match self {
            WorkingCrs::Utm { zone, south: false } => Some(32600 + zone),
            WorkingCrs::Utm { zone, south: true } => Some(32700 + zone),
            WorkingCrs::Source => None,
        }
    }

    /// Transforme une coordonnée du CRS source vers le CRS de travail
    pub fn transform(&self, coord: Coord, source: SourceCrs) -> Coord {
        let geo = match source {
            SourceCrs::Metric => return coord,
            SourceCrs::Wgs84 => Geographic::from_degrees(coord.x, coord.y),
            SourceCrs::WebMercator => web_mercator_to_geographic(coord.x, coord.y),
        };
        match self {
            WorkingCrs::Source => coord,
            WorkingCrs::Utm { zone, south } => {
                let (x, y) = geographic_to_utm(geo, *zone, *south);
                Coord { x, y }
            }
        }
    }

    /// Transforme un point
    pub fn transform_point(&self, point: Point, source: SourceCrs) -> Point {
        Point::from(self.transform(point.0, source))
    }

    /// Transforme une polyligne
    pub fn transform_line_string(&self, line: &LineString, source: SourceCrs) -> LineString {
        LineString::new(line.coords().map(|c| self.transform(*c, source)).collect())
    }

    /// Transforme un polygone (ring extérieur + trous)
    pub fn transform_polygon(&self, polygon: &Polygon, source: SourceCrs) -> Polygon {
        let exterior = self.transform_line_string(polygon.exterior(), source);
        let interiors = polygon
            .interiors()
            .iter()
            .map(|ring| self.transform_line_string(ring, source))
            .collect();
        Polygon::new(exterior, interiors)
    }
}

/// Convertit des coordonnées géographiques vers UTM (séries de Snyder)
pub fn geographic_to_utm(geo: Geographic, zone: u32, south: bool) -> (f64, f64) {
    let a = Wgs84::A;
    let e2 = Wgs84::E2;
    let ep2 = Wgs84::EP2;

    // Paramètres UTM
    let k0 = 0.9996; // Facteur d'échelle
    let x0 = 500000.0; // False easting
    let y0 = if south { 10000000.0 } else { 0.0 }; // False northing

    // Longitude centrale de la zone
    let lon0 = ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians();

    let lat = geo.lat;
    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = a / (1.0 - e2 * sin_lat.powi(2)).sqrt();
    let t = tan_lat.powi(2);
    let c = ep2 * cos_lat.powi(2);
    let a_ = (geo.lon - lon0) * cos_lat;

    // Longueur d'arc de méridien depuis l'équateur
    let m = a
        * ((1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0) * lat
            - (3.0 * e2 / 8.0 + 3.0 * e2.powi(2) / 32.0 + 45.0 * e2.powi(3) / 1024.0)
                * (2.0 * lat).sin()
            + (15.0 * e2.powi(2) / 256.0 + 45.0 * e2.powi(3) / 1024.0) * (4.0 * lat).sin()
            - (35.0 * e2.powi(3) / 3072.0) * (6.0 * lat).sin());

    let x = k0
        * n
        * (a_
            + (1.0 - t + c) * a_.powi(3) / 6.0
            + (5.0 - 18.0 * t + t.powi(2) + 72.0 * c - 58.0 * ep2) * a_.powi(5) / 120.0)
        + x0;

    let y = k0
        * (m + n
            * tan_lat
            * (a_.powi(2) / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c.powi(2)) * a_.powi(4) / 24.0
                + (61.0 - 58.0 * t + t.powi(2) + 600.0 * c - 330.0 * ep2) * a_.powi(6) / 720.0))
        + y0;

    (x, y)
}

/// Convertit Web Mercator vers coordonnées géographiques
pub fn web_mercator_to_geographic(x: f64, y: f64) -> Geographic {
    let r = Wgs84::A;

    // Longitude = x / R
    let lon = x / r;

    // Latitude = 2 * atan(exp(y/R)) - π/2
    let lat = 2.0 * (y / r).exp().atan() - std::f64::consts::FRAC_PI_2;

    Geographic::new(lon, lat)
}
