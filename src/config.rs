//! Run parameters, persisted with Bincode.

use std::{io, path::Path};

use bincode::{Decode, Encode};
use lin_alg::f64::Vec3;

use crate::util::{self, array_to_vec3, vec3_to_array};

pub const DEFAULT_CONFIG_FILE: &str = "config.vbem";

#[derive(Clone, Debug, PartialEq, Encode, Decode)]
pub struct Config {
    /// Reynolds number.
    pub re: f64,
    pub dt: f64,
    /// Freestream velocity.
    pub fs: [f64; 3],
    pub num_timesteps: usize,
    /// Record diagnostics every this many steps.
    pub diagnostic_ratio: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            re: 100.,
            dt: 0.01,
            fs: [0.; 3],
            num_timesteps: 100,
            diagnostic_ratio: 1,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> io::Result<Self> {
        util::load(path)
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        util::save(path, self)
    }

    pub fn freestream(&self) -> Vec3 {
        array_to_vec3(self.fs)
    }

    pub fn set_freestream(&mut self, fs: Vec3) {
        self.fs = vec3_to_array(fs);
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    #[test]
    fn save_and_load() {
        let path = env::temp_dir().join("vortex_bem_config_test.vbem");

        let mut cfg = Config {
            re: 250.,
            num_timesteps: 7,
            ..Default::default()
        };
        cfg.set_freestream(Vec3::new(1., 0., -0.5));
        cfg.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.freestream().z, -0.5);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = env::temp_dir().join("vortex_bem_no_such_config.vbem");
        assert!(Config::load(&path).is_err());
    }
}
