//! Packed agent record shared by host initialisation, the update stage and
//! the draw stage.
//!
//! The layout is six `f32` scalars: position, velocity, scale. The compute
//! kernel declares the same struct, and the draw pipeline reads it as a
//! per-instance vertex buffer, so the offsets below are a fixed contract.

/// Scalars per record.
pub const AGENT_STRIDE: usize = 6;
/// Bytes per record.
pub const AGENT_SIZE: usize = AGENT_STRIDE * std::mem::size_of::<f32>();

/// Scalar offset of `position`.
pub const POSITION_OFFSET: usize = 0;
/// Scalar offset of `velocity`.
pub const VELOCITY_OFFSET: usize = POSITION_OFFSET + 2;
/// Scalar offset of `scale`.
pub const SCALE_OFFSET: usize = VELOCITY_OFFSET + 2;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct AgentRecord {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    /// `(base / aspect_divisor, base)`, pre-corrected for anisotropic viewports.
    pub scale: [f32; 2],
}

const _: () = assert!(
    std::mem::size_of::<AgentRecord>() == AGENT_SIZE,
    "size of AgentRecord does not match WGSL"
);
const _: () = assert!(
    std::mem::offset_of!(AgentRecord, position) == POSITION_OFFSET * 4,
    "offset of AgentRecord.position does not match WGSL"
);
const _: () = assert!(
    std::mem::offset_of!(AgentRecord, velocity) == VELOCITY_OFFSET * 4,
    "offset of AgentRecord.velocity does not match WGSL"
);
const _: () = assert!(
    std::mem::offset_of!(AgentRecord, scale) == SCALE_OFFSET * 4,
    "offset of AgentRecord.scale does not match WGSL"
);

impl AgentRecord {
    const ATTRIBS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x2];

    pub fn new(position: [f32; 2], velocity: [f32; 2], scale: [f32; 2]) -> Self {
        Self {
            position,
            velocity,
            scale,
        }
    }

    pub fn encode(&self) -> [f32; AGENT_STRIDE] {
        let mut out = [0.0; AGENT_STRIDE];
        out[POSITION_OFFSET..POSITION_OFFSET + 2].copy_from_slice(&self.position);
        out[VELOCITY_OFFSET..VELOCITY_OFFSET + 2].copy_from_slice(&self.velocity);
        out[SCALE_OFFSET..SCALE_OFFSET + 2].copy_from_slice(&self.scale);
        out
    }

    pub fn decode(scalars: &[f32; AGENT_STRIDE]) -> Self {
        Self {
            position: [scalars[POSITION_OFFSET], scalars[POSITION_OFFSET + 1]],
            velocity: [scalars[VELOCITY_OFFSET], scalars[VELOCITY_OFFSET + 1]],
            scale: [scalars[SCALE_OFFSET], scalars[SCALE_OFFSET + 1]],
        }
    }

    /// Per-instance layout for the draw stage, locations 0..=2.
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: AGENT_SIZE as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Views a pool's records as the flat scalar buffer, `N * AGENT_STRIDE` long.
pub fn as_scalars(records: &[AgentRecord]) -> &[f32] {
    bytemuck::cast_slice(records)
}
