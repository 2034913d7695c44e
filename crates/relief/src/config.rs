//! Planet configuration: a flat `key = value` text format parsed and
//! validated in one step into an immutable record.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required config field {0:?}")]
    MissingField(&'static str),

    #[error("config field {key:?} must be numeric, got {value:?}")]
    NotNumeric { key: &'static str, value: String },

    #[error("config line {0} is not a `key = value` pair")]
    Malformed(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Validated, immutable planet description.
///
/// `tilt`, `rotation` and `display_name` are display-only parameters carried
/// for downstream viewers; the core math never reads them.
#[derive(Debug, Clone)]
pub struct PlanetConfig {
    /// Minimum elevation, meters.
    pub h_min: f64,
    /// Maximum elevation, meters.
    pub h_max: f64,
    /// Planet radius, meters.
    pub radius: f64,
    /// Unit scale factor applied to radius and heights (`sfR`).
    pub unit_scale: f64,
    /// Image downsample factor (`sf`).
    pub downsample: f64,
    /// Source topographic image identifier.
    pub topo: String,
    /// Source texture image identifier.
    pub texture: String,
    /// Output mesh artifact identifier.
    pub mesh: String,
    /// Sphere tessellation angular resolution (`res`).
    pub resolution: u32,
    pub tilt: Option<f64>,
    pub rotation: Option<f64>,
    pub display_name: Option<String>,
}

const DEFAULT_RESOLUTION: u32 = 200;

impl PlanetConfig {
    /// Parse and validate; the single entry point. Missing required fields
    /// abort before any image is touched.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut pairs: HashMap<&str, &str> = HashMap::new();

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .ok_or(ConfigError::Malformed(lineno + 1))?;
            pairs.insert(key.trim(), value.trim());
        }

        let text_field = |key: &'static str| -> Result<String, ConfigError> {
            pairs
                .get(key)
                .map(|v| v.to_string())
                .ok_or(ConfigError::MissingField(key))
        };

        let num_field = |key: &'static str| -> Result<f64, ConfigError> {
            let value = pairs.get(key).ok_or(ConfigError::MissingField(key))?;
            value.parse::<f64>().map_err(|_| ConfigError::NotNumeric {
                key,
                value: value.to_string(),
            })
        };

        let opt_num = |key: &'static str| -> Result<Option<f64>, ConfigError> {
            match pairs.get(key) {
                None => Ok(None),
                Some(value) => value
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| ConfigError::NotNumeric {
                        key,
                        value: value.to_string(),
                    }),
            }
        };

        let resolution = match opt_num("res")? {
            Some(r) => r as u32,
            None => DEFAULT_RESOLUTION,
        };

        Ok(Self {
            h_min: num_field("hMin")?,
            h_max: num_field("hMax")?,
            radius: num_field("R")?,
            unit_scale: num_field("sfR")?,
            downsample: num_field("sf")?,
            topo: text_field("topo")?,
            texture: text_field("texture")?,
            mesh: text_field("mesh")?,
            resolution,
            tilt: opt_num("tilt")?,
            rotation: opt_num("rotation")?,
            display_name: pairs.get("name").map(|v| v.to_string()),
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Sphere radius in output units: configured radius times `sfR`.
    pub fn scaled_radius(&self) -> f64 {
        self.radius * self.unit_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "\
# mars
hMin = -8000
hMax = 14000
R = 3389500
sfR = 0.001
sf = 8
topo = marsCylindrical.jpg
texture = marsTexture.jpg
mesh = marstopo.rmsh
tilt = 25
res = 800
name = Mars
";

    #[test]
    fn parses_full_config() {
        let cfg = PlanetConfig::parse(FULL).unwrap();
        assert_eq!(cfg.h_min, -8000.0);
        assert_eq!(cfg.h_max, 14000.0);
        assert_eq!(cfg.radius, 3389500.0);
        assert_eq!(cfg.unit_scale, 0.001);
        assert_eq!(cfg.downsample, 8.0);
        assert_eq!(cfg.topo, "marsCylindrical.jpg");
        assert_eq!(cfg.texture, "marsTexture.jpg");
        assert_eq!(cfg.mesh, "marstopo.rmsh");
        assert_eq!(cfg.resolution, 800);
        assert_eq!(cfg.tilt, Some(25.0));
        assert_eq!(cfg.rotation, None);
        assert_eq!(cfg.display_name.as_deref(), Some("Mars"));
        assert!((cfg.scaled_radius() - 3389.5).abs() < 1e-9);
    }

    #[test]
    fn missing_required_field_is_a_hard_error() {
        let without_radius: String = FULL
            .lines()
            .filter(|l| !l.starts_with("R "))
            .collect::<Vec<_>>()
            .join("\n");

        match PlanetConfig::parse(&without_radius) {
            Err(ConfigError::MissingField("R")) => {}
            other => panic!("expected MissingField(R), got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn non_numeric_numeric_field_is_rejected() {
        let broken = FULL.replace("hMin = -8000", "hMin = deep");
        assert!(matches!(
            PlanetConfig::parse(&broken),
            Err(ConfigError::NotNumeric { key: "hMin", .. })
        ));
    }

    #[test]
    fn malformed_line_reports_its_number() {
        assert!(matches!(
            PlanetConfig::parse("hMin = 1\nnot a pair\n"),
            Err(ConfigError::Malformed(2))
        ));
    }

    #[test]
    fn resolution_defaults_when_absent() {
        let without_res: String = FULL
            .lines()
            .filter(|l| !l.starts_with("res"))
            .collect::<Vec<_>>()
            .join("\n");

        let cfg = PlanetConfig::parse(&without_res).unwrap();
        assert_eq!(cfg.resolution, DEFAULT_RESOLUTION);
    }
}
