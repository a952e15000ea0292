//! Solid boundary shapes, which generate triangulated panels at a given resolution.

use std::{
    collections::HashMap,
    fmt,
    fmt::Formatter,
    path::PathBuf,
};

use lin_alg::f64::Vec3;

use crate::{
    body::BodyId,
    element_packet::ElementPacket,
    error::Result,
    geom_import::read_geometry_file,
};

/// Golden ratio; icosahedron vertex coordinate.
const PHI: f64 = 1.618_033_988_749_895;
/// Stop refining spheres past this many subdivisions (20 * 4^n panels).
const MAX_SPHERE_LEVEL: usize = 7;

pub trait BoundaryFeature: fmt::Display {
    /// Build panels with edges near `ips` long. Values are boundary conditions per panel.
    fn init_elements(&self, ips: f64) -> Result<ElementPacket>;

    /// The body the panels ride on. `None` means fixed in space.
    fn body(&self) -> Option<BodyId>;
}

fn push_node(x: &mut Vec<f64>, p: Vec3) {
    x.extend_from_slice(&[p.x, p.y, p.z]);
}

/// Reverse the winding of every panel, so normals face the other way. Used for internal flows.
fn flip_winding(packet: &mut ElementPacket) {
    for tri in packet.idx.chunks_exact_mut(3) {
        tri.swap(1, 2);
    }
}

/// Split a (possibly non-planar) quad into an `n1` by `n2` grid of triangle pairs, with
/// normals along `(c1 - c0) × (c3 - c0)`. Corners go around the quad in order.
fn add_quad_grid(packet: &mut ElementPacket, corners: [Vec3; 4], n1: usize, n2: usize) {
    let [c0, c1, c2, c3] = corners;
    let first = (packet.x.len() / 3) as u32;

    for j in 0..=n2 {
        let v = j as f64 / n2 as f64;
        for i in 0..=n1 {
            let u = i as f64 / n1 as f64;
            let p = c0 * ((1. - u) * (1. - v))
                + c1 * (u * (1. - v))
                + c2 * (u * v)
                + c3 * ((1. - u) * v);
            push_node(&mut packet.x, p);
        }
    }

    let row = (n1 + 1) as u32;
    for j in 0..n2 as u32 {
        for i in 0..n1 as u32 {
            let a = first + j * row + i;
            let b = a + 1;
            let c = b + row;
            let d = a + row;
            packet.idx.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
}

fn divisions(len: f64, ips: f64) -> usize {
    ((len / ips).ceil() as usize).max(1)
}

fn icosahedron() -> (Vec<Vec3>, Vec<[u32; 3]>) {
    let nodes = [
        (-1., PHI, 0.),
        (1., PHI, 0.),
        (-1., -PHI, 0.),
        (1., -PHI, 0.),
        (0., -1., PHI),
        (0., 1., PHI),
        (0., -1., -PHI),
        (0., 1., -PHI),
        (PHI, 0., -1.),
        (PHI, 0., 1.),
        (-PHI, 0., -1.),
        (-PHI, 0., 1.),
    ]
    .iter()
    .map(|&(x, y, z)| Vec3::new(x, y, z).to_normalized())
    .collect();

    let tris = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    (nodes, tris)
}

/// Split each triangle into 4, pushing new nodes out to the unit sphere.
fn subdivide(nodes: &mut Vec<Vec3>, tris: &[[u32; 3]]) -> Vec<[u32; 3]> {
    let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
    let mut midpoint = |a: u32, b: u32, nodes: &mut Vec<Vec3>| -> u32 {
        let key = (a.min(b), a.max(b));
        *midpoints.entry(key).or_insert_with(|| {
            let mid = ((nodes[a as usize] + nodes[b as usize]) * 0.5).to_normalized();
            nodes.push(mid);
            (nodes.len() - 1) as u32
        })
    };

    let mut result = Vec::with_capacity(tris.len() * 4);
    for &[a, b, c] in tris {
        let ab = midpoint(a, b, nodes);
        let bc = midpoint(b, c, nodes);
        let ca = midpoint(c, a, nodes);
        result.extend_from_slice(&[[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
    }
    result
}

/// A sphere or ellipsoid. `scale` holds the diameters along each axis.
#[derive(Clone, Debug)]
pub struct Ovoid {
    pub body: Option<BodyId>,
    /// Flow is outside the shape.
    pub external: bool,
    pub center: Vec3,
    pub scale: Vec3,
}

impl Ovoid {
    pub fn new(body: Option<BodyId>, center: Vec3, diameter: f64) -> Self {
        Self {
            body,
            external: true,
            center,
            scale: Vec3::new(diameter, diameter, diameter),
        }
    }
}

impl BoundaryFeature for Ovoid {
    fn init_elements(&self, ips: f64) -> Result<ElementPacket> {
        let (mut nodes, mut tris) = icosahedron();

        let max_rad = 0.5 * self.scale.x.max(self.scale.y).max(self.scale.z);
        // Edge length of the unit icosahedron, halving per level.
        let mut edge = 4. / (10. + 2. * 5_f64.sqrt()).sqrt() * max_rad;
        let mut level = 0;
        while edge > ips && level < MAX_SPHERE_LEVEL {
            tris = subdivide(&mut nodes, &tris);
            edge *= 0.5;
            level += 1;
        }

        let mut packet = ElementPacket::default();
        for n in nodes {
            let p = Vec3::new(
                n.x * 0.5 * self.scale.x,
                n.y * 0.5 * self.scale.y,
                n.z * 0.5 * self.scale.z,
            );
            push_node(&mut packet.x, self.center + p);
        }
        packet.idx = tris.into_iter().flatten().collect();
        packet.val = vec![0.; 2 * packet.num_panels()];

        if !self.external {
            flip_winding(&mut packet);
        }
        Ok(packet)
    }

    fn body(&self) -> Option<BodyId> {
        self.body
    }
}

impl fmt::Display for Ovoid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ovoid at {} {} {} with scale {} {} {}",
            self.center.x, self.center.y, self.center.z, self.scale.x, self.scale.y, self.scale.z
        )
    }
}

/// An axis-aligned box, centered on `center`, with side lengths `scale`.
#[derive(Clone, Debug)]
pub struct SolidRect {
    pub body: Option<BodyId>,
    pub external: bool,
    pub center: Vec3,
    pub scale: Vec3,
}

impl BoundaryFeature for SolidRect {
    fn init_elements(&self, ips: f64) -> Result<ElementPacket> {
        let s = self.scale;
        let o = self.center - s * 0.5;
        let (ex, ey, ez) = (
            Vec3::new(s.x, 0., 0.),
            Vec3::new(0., s.y, 0.),
            Vec3::new(0., 0., s.z),
        );
        let (nx, ny, nz) = (divisions(s.x, ips), divisions(s.y, ips), divisions(s.z, ips));

        // Origin, then two edges whose cross product points outward.
        let faces = [
            (o + ex, ey, ez, ny, nz),
            (o, ez, ey, nz, ny),
            (o + ey, ez, ex, nz, nx),
            (o, ex, ez, nx, nz),
            (o + ez, ex, ey, nx, ny),
            (o, ey, ex, ny, nx),
        ];

        let mut packet = ElementPacket::default();
        for (origin, e1, e2, n1, n2) in faces {
            add_quad_grid(
                &mut packet,
                [origin, origin + e1, origin + e1 + e2, origin + e2],
                n1,
                n2,
            );
        }
        packet.val = vec![0.; 2 * packet.num_panels()];

        if !self.external {
            flip_winding(&mut packet);
        }
        Ok(packet)
    }

    fn body(&self) -> Option<BodyId> {
        self.body
    }
}

impl fmt::Display for SolidRect {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rectangular prism at {} {} {} with scale {} {} {}",
            self.center.x, self.center.y, self.center.z, self.scale.x, self.scale.y, self.scale.z
        )
    }
}

/// A single quadrilateral sheet, with a 3-component boundary condition: tangential along
/// x1 and x2, then normal.
#[derive(Clone, Debug)]
pub struct BoundaryQuad {
    pub body: Option<BodyId>,
    /// Corners, in order around the quad.
    pub corners: [Vec3; 4],
    pub bc: Vec3,
}

impl BoundaryFeature for BoundaryQuad {
    fn init_elements(&self, ips: f64) -> Result<ElementPacket> {
        let [c0, c1, _, c3] = self.corners;
        let n1 = divisions((c1 - c0).magnitude(), ips);
        let n2 = divisions((c3 - c0).magnitude(), ips);

        let mut packet = ElementPacket::default();
        add_quad_grid(&mut packet, self.corners, n1, n2);

        let np = packet.num_panels();
        packet.val = Vec::with_capacity(3 * np);
        for _ in 0..np {
            packet.val.extend_from_slice(&[self.bc.x, self.bc.y, self.bc.z]);
        }
        Ok(packet)
    }

    fn body(&self) -> Option<BodyId> {
        self.body
    }
}

impl fmt::Display for BoundaryQuad {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let c = self.corners[0];
        write!(
            f,
            "rectangular plane at {} {} {} with bc {} {} {}",
            c.x, c.y, c.z, self.bc.x, self.bc.y, self.bc.z
        )
    }
}

/// A mesh read from file, scaled per axis, then moved to `center`.
#[derive(Clone, Debug)]
pub struct ExteriorFromFile {
    pub body: Option<BodyId>,
    pub external: bool,
    pub center: Vec3,
    pub scale: Vec3,
    pub path: PathBuf,
}

impl BoundaryFeature for ExteriorFromFile {
    fn init_elements(&self, _ips: f64) -> Result<ElementPacket> {
        let mut packet = read_geometry_file(&self.path)?;

        for p in packet.x.chunks_exact_mut(3) {
            p[0] = self.center.x + p[0] * self.scale.x;
            p[1] = self.center.y + p[1] * self.scale.y;
            p[2] = self.center.z + p[2] * self.scale.z;
        }
        packet.val = vec![0.; 2 * packet.num_panels()];

        if !self.external {
            flip_winding(&mut packet);
        }
        Ok(packet)
    }

    fn body(&self) -> Option<BodyId> {
        self.body
    }
}

impl fmt::Display for ExteriorFromFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "file mesh ({}) at {} {} {}",
            self.path.display(),
            self.center.x,
            self.center.y,
            self.center.z
        )
    }
}

#[cfg(test)]
mod tests {
    use std::{env, f64::consts::PI, fs};

    use approx::assert_relative_eq;

    use super::*;
    use crate::{
        body::Body,
        elements::{ElemType, MoveType},
        surfaces::Surfaces,
    };

    /// Volume of a closed, outward-wound mesh, via the body-bound surface machinery.
    fn volume(packet: &ElementPacket) -> f64 {
        let bodies = [Body::new("test")];
        let mut surf = Surfaces::new(
            packet,
            ElemType::Reactive,
            MoveType::BodyBound,
            Some(BodyId(0)),
        )
        .unwrap();
        surf.transform(0., &bodies);
        surf.get_vol().unwrap()
    }

    #[test]
    fn sphere_volume_converges() {
        let sphere = Ovoid::new(None, Vec3::new(1., 2., 3.), 2.);
        let packet = sphere.init_elements(0.1).unwrap();

        assert!(packet.validate_panels().is_ok());
        assert_eq!(packet.val.len(), 2 * packet.num_panels());
        assert_relative_eq!(volume(&packet), 4. / 3. * PI, max_relative = 0.02);
    }

    #[test]
    fn coarse_sphere_is_icosahedron() {
        let sphere = Ovoid::new(None, Vec3::new_zero(), 1.);
        let packet = sphere.init_elements(10.).unwrap();
        assert_eq!(packet.num_panels(), 20);
        assert_eq!(packet.num_nodes(), 12);
    }

    #[test]
    fn internal_flow_flips_normals() {
        let mut sphere = Ovoid::new(None, Vec3::new_zero(), 1.);
        sphere.external = false;
        let packet = sphere.init_elements(10.).unwrap();
        assert!(volume(&packet) < 0.);
    }

    #[test]
    fn box_volume_is_exact() {
        let rect = SolidRect {
            body: None,
            external: true,
            center: Vec3::new(0.5, 0., -1.),
            scale: Vec3::new(1., 2., 0.5),
        };
        let packet = rect.init_elements(0.3).unwrap();

        assert!(packet.validate_panels().is_ok());
        assert_relative_eq!(volume(&packet), 1., epsilon = 1e-12);
    }

    #[test]
    fn quad_carries_three_bcs() {
        let quad = BoundaryQuad {
            body: None,
            corners: [
                Vec3::new(0., 0., 0.),
                Vec3::new(1., 0., 0.),
                Vec3::new(1., 1., 0.),
                Vec3::new(0., 1., 0.),
            ],
            bc: Vec3::new(0.1, 0.2, 0.3),
        };
        let packet = quad.init_elements(0.5).unwrap();

        assert_eq!(packet.num_panels(), 8);
        assert_eq!(packet.num_nodes(), 9);
        assert_eq!(packet.val.len(), 24);
        assert_eq!(&packet.val[3..6], &[0.1, 0.2, 0.3]);

        let surf = Surfaces::new(&packet, ElemType::Reactive, MoveType::Fixed, None).unwrap();
        for b in surf.get_bases() {
            assert_relative_eq!(b.norm.z, 1., epsilon = 1e-12);
        }
    }

    #[test]
    fn file_mesh_is_scaled_and_moved() {
        let path = env::temp_dir().join("vortex_bem_feature_tri.obj");
        fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

        let feature = ExteriorFromFile {
            body: None,
            external: true,
            center: Vec3::new(0., 0., 5.),
            scale: Vec3::new(2., 3., 1.),
            path: path.clone(),
        };
        let packet = feature.init_elements(0.1).unwrap();

        assert_eq!(packet.x, vec![0., 0., 5., 2., 0., 5., 0., 3., 5.]);
        assert_eq!(packet.val.len(), 2);

        let _ = fs::remove_file(&path);
    }
}
