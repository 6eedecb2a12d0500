//! Vertex data for the two drawn stages.
//!
//! Both meshes use a single `vec2<f32>` attribute in clip-like [-1, 1] space:
//! a full-screen quad for the composite, and a tessellated light-wave grid
//! that the caustics stage displaces through the simulated surface.

use bytemuck::{Pod, Zeroable};

/// Vertices per cell of the light-wave mesh (two triangles).
pub const VERTICES_PER_CELL: usize = 6;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct PlaneVertex {
    pub position: [f32; 2],
}

impl PlaneVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub const fn new(x: f32, y: f32) -> Self {
        Self { position: [x, y] }
    }

    /// Vertex buffer layout for wgpu
    pub fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Two triangles covering the whole target.
pub const FULLSCREEN_QUAD: [PlaneVertex; 6] = [
    PlaneVertex::new(-1.0, -1.0),
    PlaneVertex::new(1.0, -1.0),
    PlaneVertex::new(-1.0, 1.0),
    PlaneVertex::new(1.0, -1.0),
    PlaneVertex::new(1.0, 1.0),
    PlaneVertex::new(-1.0, 1.0),
];

/// Light-wave projection mesh: `subdivision` x `subdivision` cells over [-1, 1]².
pub struct LightWaveMesh {
    pub vertices: Vec<PlaneVertex>,
}

impl LightWaveMesh {
    pub fn new(subdivision: u32) -> Self {
        let cells = subdivision.max(1);
        let step = |k: u32| (k as f32 / cells as f32) * 2.0 - 1.0;
        let mut vertices = Vec::with_capacity((cells * cells) as usize * VERTICES_PER_CELL);

        for i in 0..cells {
            for j in 0..cells {
                let (x0, y0) = (step(i), step(j));
                let (x1, y1) = (step(i + 1), step(j + 1));
                vertices.extend_from_slice(&[
                    PlaneVertex::new(x0, y0),
                    PlaneVertex::new(x0, y1),
                    PlaneVertex::new(x1, y1),
                    PlaneVertex::new(x0, y0),
                    PlaneVertex::new(x1, y1),
                    PlaneVertex::new(x1, y0),
                ]);
            }
        }

        Self { vertices }
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_covers_clip_space() {
        let min_x = FULLSCREEN_QUAD.iter().map(|v| v.position[0]).fold(f32::MAX, f32::min);
        let max_y = FULLSCREEN_QUAD.iter().map(|v| v.position[1]).fold(f32::MIN, f32::max);
        assert_eq!(min_x, -1.0);
        assert_eq!(max_y, 1.0);
        assert_eq!(bytemuck::cast_slice::<_, u8>(&FULLSCREEN_QUAD).len(), 6 * 8);
    }

    #[test]
    fn test_light_wave_vertex_count() {
        let mesh = LightWaveMesh::new(256);
        assert_eq!(mesh.vertex_count(), 256 * 256 * 6);
        // 12 floats per cell
        assert_eq!(mesh.vertex_bytes().len(), 256 * 256 * 12 * 4);
    }

    #[test]
    fn test_light_wave_stays_in_unit_square() {
        let mesh = LightWaveMesh::new(16);
        for v in &mesh.vertices {
            assert!(v.position[0] >= -1.0 && v.position[0] <= 1.0);
            assert!(v.position[1] >= -1.0 && v.position[1] <= 1.0);
        }
        let first = &mesh.vertices[..6];
        assert_eq!(first[0].position, [-1.0, -1.0]);
        assert_eq!(first[2].position, [-1.0 + 2.0 / 16.0, -1.0 + 2.0 / 16.0]);
    }

    #[test]
    fn test_layout_stride() {
        assert_eq!(PlaneVertex::buffer_layout().array_stride, 8);
    }
}
