//! Built-in configuration presets.

use clap::ValueEnum;
use vehicle_rig::RigConfig;

/// Named configuration shipped with the tuner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Road motorcycle; identical to the defaults.
    Motorcycle,
    /// Low scooter with softer lean gains.
    Scooter,
    /// Slow free-orbit camera with a narrow lens.
    Cinematic,
}

impl Preset {
    pub const ALL: [Self; 3] = [Self::Motorcycle, Self::Scooter, Self::Cinematic];

    /// TOML source of the preset.
    #[must_use]
    pub fn source(self) -> &'static str {
        match self {
            Self::Motorcycle => include_str!("../presets/motorcycle.toml"),
            Self::Scooter => include_str!("../presets/scooter.toml"),
            Self::Cinematic => include_str!("../presets/cinematic.toml"),
        }
    }

    pub fn config(self) -> vehicle_rig::Result<RigConfig> {
        RigConfig::from_toml_str(self.source())
    }
}

#[cfg(test)]
mod tests {
    use vehicle_rig::CameraMode;

    use super::*;

    #[test]
    fn test_every_preset_parses() {
        for preset in Preset::ALL {
            assert!(preset.config().is_ok(), "{preset:?} failed to load");
        }
    }

    #[test]
    fn test_motorcycle_matches_defaults() {
        assert_eq!(Preset::Motorcycle.config().unwrap(), RigConfig::default());
    }

    #[test]
    fn test_cinematic_keeps_default_stabilizer() {
        let config = Preset::Cinematic.config().unwrap();
        assert_eq!(config.camera.mode, CameraMode::FreeOrbit);
        assert_eq!(config.stabilizer, RigConfig::default().stabilizer);
    }
}
