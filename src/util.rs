use std::{
    fs::File,
    io::{self, ErrorKind, Read, Write},
    path::Path,
};

use bincode::{config, Decode, Encode};
use lin_alg::f64::Vec3;

/// Save to file, using Bincode.
pub fn save<T: Encode>(path: &Path, data: &T) -> io::Result<()> {
    let config = config::standard();

    let encoded: Vec<u8> = bincode::encode_to_vec(data, config)
        .map_err(|e| io::Error::new(ErrorKind::InvalidData, e.to_string()))?;

    let mut file = File::create(path)?;
    file.write_all(&encoded)?;
    Ok(())
}

/// Load from file, using Bincode.
pub fn load<T: Decode<()>>(path: &Path) -> io::Result<T> {
    let config = config::standard();

    let mut file = File::open(path)?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;

    let (decoded, _len) = bincode::decode_from_slice(&buffer, config)
        .map_err(|e| io::Error::new(ErrorKind::InvalidData, e.to_string()))?;
    Ok(decoded)
}

/// `(x, y, z)` triples to vectors. Trailing values that don't fill a triple are dropped;
/// callers check lengths first.
pub fn to_vec3s(flat: &[f64]) -> Vec<Vec3> {
    flat.chunks_exact(3)
        .map(|c| Vec3::new(c[0], c[1], c[2]))
        .collect()
}

pub fn vec3_to_array(v: Vec3) -> [f64; 3] {
    [v.x, v.y, v.z]
}

pub fn array_to_vec3(v: [f64; 3]) -> Vec3 {
    Vec3::new(v[0], v[1], v[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_to_vec3s() {
        let v = to_vec3s(&[1., 2., 3., 4., 5., 6.]);
        assert_eq!(v.len(), 2);
        assert_eq!(v[1].y, 5.);
        assert_eq!(vec3_to_array(v[0]), [1., 2., 3.]);
    }
}
