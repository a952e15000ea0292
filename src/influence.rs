//! Source-to-target velocity accumulation between element collections.
//!
//! Sources are snapshotted before the target is borrowed mutably, so a collection can act on
//! itself. The kernel is chosen from the (source kind, target kind) pair; the match below is
//! exhaustive, so every pair that can occur has a defined path. Raw velocities are accumulated
//! without the 1/4π factor; targets apply it when finalized.

use lin_alg::f64::Vec3;
use log::debug;
use rayon::prelude::*;

use crate::{
    collection::Collection,
    elements::ElemType,
    kernels::{
        centroid, kernel_0v_0b, kernel_0v_0bg, kernel_0v_0p, kernel_2_0b, kernel_2_0bg,
        kernel_2_0p, kernel_2s_0b, kernel_2s_0p, VelGrad,
    },
    points::Points,
    surfaces::Surfaces,
};

/// Squared distance below which a source panel is taken to be the target panel itself.
const SELF_PANEL_DIST_SQ: f64 = 1e-24;

/// A read-only copy of the data a collection exerts influence with.
#[derive(Clone, Debug)]
pub enum Sources {
    /// Thick-cored vortex particles.
    Particles {
        x: Vec<Vec3>,
        s: Vec<Vec3>,
        r: Vec<f64>,
    },
    /// Constant-strength triangular panels. `ss` is the optional source sheet strength.
    Panels {
        tris: Vec<[Vec3; 3]>,
        s: Vec<Vec3>,
        ss: Option<Vec<f64>>,
    },
}

impl Sources {
    /// `None` for collections that carry no strength (inert ones).
    pub fn from_collection(coll: &Collection) -> Option<Self> {
        if coll.get_elem_type() == ElemType::Inert {
            return None;
        }

        match coll {
            Collection::Points(c) => c.get_str().map(|s| Self::Particles {
                x: c.get_pos().to_vec(),
                s: s.to_vec(),
                r: c.get_rad().to_vec(),
            }),
            Collection::Surfaces(c) => Some(Self::Panels {
                tris: c.get_tris(),
                s: c.get_str().to_vec(),
                ss: c.get_src_str().map(|ss| ss.to_vec()),
            }),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Particles { x, .. } => x.len(),
            Self::Panels { tris, .. } => tris.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Accumulate the velocity (and gradients, where the target tracks them) that `src` induces
/// on every target element.
pub fn compute_influence(src: &Sources, targ: &mut Collection) {
    debug!("    computing influence of {} sources on{}", src.len(), targ);

    match (src, targ) {
        (Sources::Particles { x, s, r }, Collection::Points(t)) => points_on_points(x, s, r, t),
        (Sources::Particles { x, s, r }, Collection::Surfaces(t)) => points_on_panels(x, s, r, t),
        (Sources::Panels { tris, s, ss }, Collection::Points(t)) => {
            panels_on_points(tris, s, ss.as_deref(), t)
        }
        (Sources::Panels { tris, s, ss }, Collection::Surfaces(t)) => {
            panels_on_panels(tris, s, ss.as_deref(), t)
        }
    }
}

fn points_on_points(sx: &[Vec3], ss: &[Vec3], sr: &[f64], targ: &mut Points) {
    let blob = targ.is_blob();
    let (tx, tr, tu, tug) = targ.targets_mut();

    match tug {
        Some(tug) => {
            tu.par_iter_mut()
                .zip(tug.par_iter_mut())
                .enumerate()
                .for_each(|(i, (u, ug))| {
                    for j in 0..sx.len() {
                        let (v, g) = kernel_0v_0bg(sx[j], sr[j], ss[j], tx[i], tr[i]);
                        *u += v;
                        *ug += g;
                    }
                });
        }
        None => {
            tu.par_iter_mut().enumerate().for_each(|(i, u)| {
                for j in 0..sx.len() {
                    *u += if blob {
                        kernel_0v_0b(sx[j], sr[j], ss[j], tx[i], tr[i])
                    } else {
                        kernel_0v_0p(sx[j], sr[j], ss[j], tx[i])
                    };
                }
            });
        }
    }
}

/// Panels are evaluated at their centroids, as singular points.
fn points_on_panels(sx: &[Vec3], ss: &[Vec3], sr: &[f64], targ: &mut Surfaces) {
    let tx = targ.get_centroids();

    targ.vels_mut()
        .par_iter_mut()
        .zip(tx.par_iter())
        .for_each(|(u, tx)| {
            for j in 0..sx.len() {
                *u += kernel_0v_0p(sx[j], sr[j], ss[j], *tx);
            }
        });
}

fn panels_on_points(tris: &[[Vec3; 3]], ps: &[Vec3], pss: Option<&[f64]>, targ: &mut Points) {
    let blob = targ.is_blob();
    let (tx, tr, tu, tug) = targ.targets_mut();

    // Source sheets add velocity only; they contribute no gradient here.
    let add_sources = |u: &mut Vec3, x: Vec3, r: f64| {
        if let Some(pss) = pss {
            for (tri, strength) in tris.iter().zip(pss) {
                *u += if blob {
                    kernel_2s_0b(tri, *strength, x, r)
                } else {
                    kernel_2s_0p(tri, *strength, x)
                };
            }
        }
    };

    match tug {
        Some(tug) => {
            tu.par_iter_mut()
                .zip(tug.par_iter_mut())
                .enumerate()
                .for_each(|(i, (u, ug))| {
                    let mut grad = VelGrad::new_zero();
                    for (tri, s) in tris.iter().zip(ps) {
                        let (v, g) = kernel_2_0bg(tri, *s, tx[i], tr[i]);
                        *u += v;
                        grad += g;
                    }
                    *ug += grad;
                    add_sources(u, tx[i], tr[i]);
                });
        }
        None => {
            tu.par_iter_mut().enumerate().for_each(|(i, u)| {
                for (tri, s) in tris.iter().zip(ps) {
                    *u += if blob {
                        kernel_2_0b(tri, *s, tx[i], tr[i])
                    } else {
                        kernel_2_0p(tri, *s, tx[i])
                    };
                }
                add_sources(u, tx[i], tr[i]);
            });
        }
    }
}

/// A panel's influence on its own centroid is omitted; the collapsed quadrature has a point
/// there, where the singular kernel is undefined.
fn panels_on_panels(tris: &[[Vec3; 3]], ps: &[Vec3], pss: Option<&[f64]>, targ: &mut Surfaces) {
    let tx = targ.get_centroids();

    targ.vels_mut()
        .par_iter_mut()
        .zip(tx.par_iter())
        .for_each(|(u, tx)| {
            for (j, tri) in tris.iter().enumerate() {
                if (centroid(tri) - *tx).magnitude_squared() < SELF_PANEL_DIST_SQ {
                    continue;
                }
                *u += kernel_2_0p(tri, ps[j], *tx);
                if let Some(pss) = pss {
                    *u += kernel_2s_0p(tri, pss[j], *tx);
                }
            }
        });
}
