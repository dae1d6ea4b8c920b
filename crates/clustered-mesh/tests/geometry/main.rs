use clustered_mesh::math::{Point, Real};

mod build_pipeline;
mod random_meshes;
mod serialized_layout;

/// A `nx × nz` grid of quads split in two triangles each, on the y = 0 plane unless `height`
/// says otherwise.
pub fn grid_mesh(
    nx: u32,
    nz: u32,
    spacing: Real,
    height: impl Fn(u32, u32) -> Real,
) -> (Vec<Point<Real>>, Vec<[u32; 3]>) {
    let mut vertices = Vec::new();
    for i in 0..=nx {
        for j in 0..=nz {
            vertices.push(Point::new(
                i as Real * spacing,
                height(i, j),
                j as Real * spacing,
            ));
        }
    }

    let mut triangles = Vec::new();
    for i in 0..nx {
        for j in 0..nz {
            let v = i * (nz + 1) + j;
            let right = v + nz + 1;
            triangles.push([v, v + 1, right + 1]);
            triangles.push([v, right + 1, right]);
        }
    }

    (vertices, triangles)
}

pub fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([bytes[offset], bytes[offset + 1]])
}

pub fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

pub fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    f32::from_bits(read_u32(bytes, offset))
}
