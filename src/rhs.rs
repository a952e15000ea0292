//! Converting boundary velocities into the right-hand side of the BEM system.

use log::debug;

use crate::{collection::Collection, points::Points, surfaces::Surfaces};

/// Points carry no boundary conditions; they contribute zero rows of value 0.
pub fn vels_to_rhs_points(targ: &Points) -> Vec<f64> {
    debug!("    not converting vels to RHS vector for{targ}");
    vec![0.; targ.get_n()]
}

/// `-(u · basis) - bc` per panel and unknown. With one unknown per panel, the basis is the
/// normal; with two, the tangents; with three, both tangents then the normal.
pub fn vels_to_rhs_panels(targ: &Surfaces) -> Vec<f64> {
    debug!("    convert vels to RHS vector for{targ}");

    let b = targ.get_bases();
    let tu = targ.get_vel();
    let tb = targ.get_bcs();

    assert_eq!(b.len(), tu.len(), "Basis and velocity counts differ");
    assert!(!tb.is_empty(), "No boundary conditions on target");
    for bc in tb {
        assert_eq!(bc.len(), b.len(), "Boundary condition and panel counts differ");
    }

    let nunkn = tb.len();
    let mut rhs = Vec::with_capacity(nunkn * b.len());

    for (i, (b, u)) in b.iter().zip(tu).enumerate() {
        match nunkn {
            1 => rhs.push(-u.dot(b.norm) - tb[0][i]),
            2 => {
                rhs.push(-u.dot(b.x1) - tb[0][i]);
                rhs.push(-u.dot(b.x2) - tb[1][i]);
            }
            _ => {
                rhs.push(-u.dot(b.x1) - tb[0][i]);
                rhs.push(-u.dot(b.x2) - tb[1][i]);
                rhs.push(-u.dot(b.norm) - tb[2][i]);
            }
        }
    }

    rhs
}

pub fn vels_to_rhs(targ: &Collection) -> Vec<f64> {
    match targ {
        Collection::Points(c) => vels_to_rhs_points(c),
        Collection::Surfaces(c) => vels_to_rhs_panels(c),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use lin_alg::f64::Vec3;

    use super::*;
    use crate::{
        element_packet::ElementPacket,
        elements::{ElemType, MoveType},
    };

    /// One panel in the z = 0 plane: x1 = +x, x2 = +y, normal = +z.
    fn flat_panel(bcs: Vec<f64>) -> Surfaces {
        let packet = ElementPacket::new(
            vec![0., 0., 0., 1., 0., 0., 0., 1., 0.],
            vec![0, 1, 2],
            bcs,
        );
        Surfaces::new(&packet, ElemType::Reactive, MoveType::Fixed, None).unwrap()
    }

    fn with_vel(mut surf: Surfaces, u: Vec3) -> Surfaces {
        surf.zero_vels();
        surf.vels_mut()[0] = u;
        surf
    }

    #[test]
    fn normal_only() {
        let surf = with_vel(flat_panel(vec![0.5]), Vec3::new(1., 2., 3.));
        let rhs = vels_to_rhs_panels(&surf);

        assert_eq!(rhs.len(), 1);
        assert_relative_eq!(rhs[0], -3.5);
    }

    #[test]
    fn tangential_only() {
        let surf = with_vel(flat_panel(vec![0., 1.]), Vec3::new(1., 2., 3.));
        let rhs = vels_to_rhs_panels(&surf);

        assert_eq!(rhs.len(), 2);
        assert_relative_eq!(rhs[0], -1.);
        assert_relative_eq!(rhs[1], -3.);
    }

    #[test]
    fn tangential_and_normal() {
        let surf = with_vel(flat_panel(vec![0., 0., -1.]), Vec3::new(1., 2., 3.));
        let rhs = vels_to_rhs_panels(&surf);

        assert_eq!(rhs.len(), 3);
        assert_relative_eq!(rhs[0], -1.);
        assert_relative_eq!(rhs[1], -2.);
        assert_relative_eq!(rhs[2], -2.);
    }

    #[test]
    fn points_give_zeros() {
        let packet = ElementPacket::new(vec![0.; 9], Vec::new(), Vec::new());
        let pts = Points::new(&packet, ElemType::Inert, MoveType::Fixed, None).unwrap();

        assert_eq!(vels_to_rhs(&Collection::Points(pts)), vec![0.; 3]);
    }

    #[test]
    #[should_panic(expected = "No boundary conditions on target")]
    fn panels_need_bcs() {
        let packet = ElementPacket::new(
            vec![0., 0., 0., 1., 0., 0., 0., 1., 0.],
            vec![0, 1, 2],
            vec![0., 0.],
        );
        let surf = Surfaces::new(&packet, ElemType::Active, MoveType::Fixed, None).unwrap();
        vels_to_rhs_panels(&surf);
    }
}
