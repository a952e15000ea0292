//! Viscous diffusion parameters. Only the length scales derived from them are used here; the
//! diffusion sub-step itself isn't run.

/// Nominal particle separation, in units of `sqrt(dt / re)`.
const NOM_SEP_SCALED: f64 = 2.828_427_124_746_190_1; // √8
/// Core radius over particle separation.
const PARTICLE_OVERLAP: f64 = 1.5;

#[derive(Clone, Debug)]
pub struct Diffusion {
    nom_sep_scaled: f64,
    particle_overlap: f64,
    diffuse: bool,
}

impl Default for Diffusion {
    fn default() -> Self {
        Self {
            nom_sep_scaled: NOM_SEP_SCALED,
            particle_overlap: PARTICLE_OVERLAP,
            diffuse: true,
        }
    }
}

impl Diffusion {
    pub fn get_nom_sep_scaled(&self) -> f64 {
        self.nom_sep_scaled
    }

    pub fn get_particle_overlap(&self) -> f64 {
        self.particle_overlap
    }

    pub fn get_diffuse(&self) -> bool {
        self.diffuse
    }

    pub fn set_diffuse(&mut self, diffuse: bool) {
        self.diffuse = diffuse;
    }
}
