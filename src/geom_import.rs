//! Triangle mesh import from Wavefront OBJ files.

use std::{fs, path::Path};

use log::info;

use crate::{
    element_packet::ElementPacket,
    error::{Result, SimError},
};

/// Read vertices (`v`) and faces (`f`) from an OBJ file. Polygons with more than 3 corners are
/// fan-triangulated. The packet carries one zero value per panel.
pub fn read_geometry_file(path: &Path) -> Result<ElementPacket> {
    info!("Reading {}", path.display());

    let text = fs::read_to_string(path)?;
    parse_obj(&text).map_err(|reason| SimError::Geometry {
        path: path.display().to_string(),
        reason,
    })
}

/// Resolve one face corner, eg `7`, `7/2`, `7//3`, or `-1`, to a 0-based node index.
fn parse_corner(token: &str, num_nodes: usize) -> std::result::Result<u32, String> {
    let first = token.split('/').next().unwrap_or(token);
    let i: i64 = first
        .parse()
        .map_err(|_| format!("Bad face index: {token}"))?;

    let resolved = if i > 0 {
        i - 1
    } else if i < 0 {
        num_nodes as i64 + i
    } else {
        return Err("Face index 0 is invalid".to_owned());
    };

    if resolved < 0 || resolved >= num_nodes as i64 {
        return Err(format!("Face index {i} is out of range"));
    }
    Ok(resolved as u32)
}

fn parse_obj(text: &str) -> std::result::Result<ElementPacket, String> {
    let mut x = Vec::new();
    let mut idx = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let mut tokens = line.split_whitespace();

        match tokens.next() {
            Some("v") => {
                let coords: Vec<f64> = tokens
                    .take(3)
                    .map(|t| t.parse::<f64>())
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| format!("Line {}: {e}", line_num + 1))?;
                if coords.len() != 3 {
                    return Err(format!("Line {}: vertex needs 3 coordinates", line_num + 1));
                }
                x.extend(coords);
            }
            Some("f") => {
                let num_nodes = x.len() / 3;
                let corners: Vec<u32> = tokens
                    .map(|t| parse_corner(t, num_nodes))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| format!("Line {}: {e}", line_num + 1))?;
                if corners.len() < 3 {
                    return Err(format!("Line {}: face needs 3 corners", line_num + 1));
                }
                for i in 1..corners.len() - 1 {
                    idx.extend_from_slice(&[corners[0], corners[i], corners[i + 1]]);
                }
            }
            _ => (),
        }
    }

    if idx.is_empty() {
        return Err("No triangles found".to_owned());
    }

    let num_panels = idx.len() / 3;
    info!("  read {} nodes and {num_panels} panels", x.len() / 3);

    Ok(ElementPacket::new(x, idx, vec![0.; num_panels]))
}
