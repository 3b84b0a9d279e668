use fnv::FnvHashMap;
use glam::Vec3;

/// Indexed triangle mesh; every vertex lies on a sphere so its normal is the
/// normalized position.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Icosahedron subdivided `detail` times and projected onto a sphere.
///
/// Vertex count is `10 * 4^detail + 2`, triangle count `20 * 4^detail`.
pub fn icosphere(radius: f32, detail: u32) -> Mesh {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let mut verts: Vec<Vec3> = [
        [-1.0, t, 0.0],
        [1.0, t, 0.0],
        [-1.0, -t, 0.0],
        [1.0, -t, 0.0],
        [0.0, -1.0, t],
        [0.0, 1.0, t],
        [0.0, -1.0, -t],
        [0.0, 1.0, -t],
        [t, 0.0, -1.0],
        [t, 0.0, 1.0],
        [-t, 0.0, -1.0],
        [-t, 0.0, 1.0],
    ]
    .iter()
    .map(|v| Vec3::from(*v).normalize())
    .collect();

    let mut faces: Vec<[u32; 3]> = vec![
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

    for _ in 0..detail {
        let mut midpoints: FnvHashMap<(u32, u32), u32> = FnvHashMap::default();
        let mut next = Vec::with_capacity(faces.len() * 4);
        for [a, b, c] in faces {
            let ab = midpoint(&mut verts, &mut midpoints, a, b);
            let bc = midpoint(&mut verts, &mut midpoints, b, c);
            let ca = midpoint(&mut verts, &mut midpoints, c, a);
            next.push([a, ab, ca]);
            next.push([b, bc, ab]);
            next.push([c, ca, bc]);
            next.push([ab, bc, ca]);
        }
        faces = next;
    }

    Mesh {
        positions: verts.iter().map(|v| (*v * radius).to_array()).collect(),
        indices: faces.into_iter().flatten().collect(),
    }
}

fn midpoint(
    verts: &mut Vec<Vec3>,
    cache: &mut FnvHashMap<(u32, u32), u32>,
    a: u32,
    b: u32,
) -> u32 {
    let key = if a < b { (a, b) } else { (b, a) };
    *cache.entry(key).or_insert_with(|| {
        let mid = (verts[a as usize] + verts[b as usize]).normalize();
        verts.push(mid);
        (verts.len() - 1) as u32
    })
}
