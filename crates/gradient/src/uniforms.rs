use bytemuck::{Pod, Zeroable};

use crate::params::TuningParams;
use crate::spots::SpotSet;
use crate::GradientError;

/// Fixed spot capacity of the uniform block.
pub const MAX_SPOTS: usize = 8;

/// One uniform slot: a spot position and color at GPU vector alignment.
///
/// Mirrors the WGSL `SpotSlot` struct: `position` is a vec2 at offset 0,
/// `color` a vec4 at offset 16, for a 32-byte stride.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackedSpot {
    position: [f32; 2],
    _pad: [f32; 2],
    color: [f32; 4],
}

unsafe impl Zeroable for PackedSpot {}
unsafe impl Pod for PackedSpot {}

impl PackedSpot {
    pub fn position(&self) -> [f32; 2] {
        self.position
    }

    pub fn color(&self) -> [f32; 4] {
        self.color
    }
}

/// The uniform block handed to the blending kernel.
///
/// This is the wire contract between packer and kernel; the byte schema is
/// fixed and must only ever change together with the WGSL side:
///
/// ```text
/// offset   0   spot_count: u32
/// offset   4   12 bytes zero padding
/// offset  16   spots: [PackedSpot; 8], 32-byte stride
/// offset 272   bias: f32
/// offset 276   power: f32
/// offset 280   noise: f32
/// offset 284   4 bytes zero padding
/// total  288   bytes
/// ```
///
/// Slots past `spot_count` stay zeroed; the kernel never reads them.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackedUniforms {
    spot_count: u32,
    _pad0: [u32; 3],
    spots: [PackedSpot; MAX_SPOTS],
    bias: f32,
    power: f32,
    noise: f32,
    _pad1: f32,
}

unsafe impl Zeroable for PackedUniforms {}
unsafe impl Pod for PackedUniforms {}

impl PackedUniforms {
    pub fn spot_count(&self) -> u32 {
        self.spot_count
    }

    pub fn slots(&self) -> &[PackedSpot; MAX_SPOTS] {
        &self.spots
    }

    pub fn bias(&self) -> f32 {
        self.bias
    }

    pub fn power(&self) -> f32 {
        self.power
    }

    pub fn noise(&self) -> f32 {
        self.noise
    }

    /// The raw bytes uploaded to the GPU.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Serializes a spot set and tuning scalars into the kernel's uniform block.
///
/// Deterministic and pure: identical inputs produce byte-identical output.
/// Fails with [`GradientError::InvalidSpotCount`] when the set exceeds
/// [`MAX_SPOTS`]; an empty set is valid and produces a block with a zero
/// count field.
pub fn pack(spots: &SpotSet, tuning: &TuningParams) -> Result<PackedUniforms, GradientError> {
    if spots.len() > MAX_SPOTS {
        return Err(GradientError::InvalidSpotCount {
            count: spots.len(),
            max: MAX_SPOTS,
        });
    }

    let mut packed = PackedUniforms::zeroed();
    packed.spot_count = spots.len() as u32;
    for (slot, spot) in packed.spots.iter_mut().zip(spots.iter()) {
        slot.position = [spot.position.x, spot.position.y];
        slot.color = spot.color.to_array();
    }
    packed.bias = tuning.bias();
    packed.power = tuning.power();
    packed.noise = tuning.noise();
    Ok(packed)
}

#[cfg(test)]
mod tests {
    use std::mem;

    use super::*;
    use crate::spots::{Rgba, Spot, SpotPoint};

    fn sample_set() -> SpotSet {
        SpotSet::new(vec![
            Spot::new(SpotPoint::new(0.25, 0.75), Rgba::opaque(1.0, 0.0, 0.0)),
            Spot::new(SpotPoint::new(0.5, 0.5), Rgba::new(0.0, 0.0, 1.0, 0.5)),
        ])
    }

    #[test]
    fn layout_matches_documented_schema() {
        assert_eq!(mem::size_of::<PackedSpot>(), 32);
        assert_eq!(mem::offset_of!(PackedSpot, position), 0);
        assert_eq!(mem::offset_of!(PackedSpot, color), 16);

        assert_eq!(mem::size_of::<PackedUniforms>(), 288);
        assert_eq!(mem::align_of::<PackedUniforms>(), 16);
        assert_eq!(mem::offset_of!(PackedUniforms, spot_count), 0);
        assert_eq!(mem::offset_of!(PackedUniforms, spots), 16);
        assert_eq!(mem::offset_of!(PackedUniforms, bias), 272);
        assert_eq!(mem::offset_of!(PackedUniforms, power), 276);
        assert_eq!(mem::offset_of!(PackedUniforms, noise), 280);
        assert_eq!(mem::size_of::<PackedUniforms>() % 16, 0);
    }

    #[test]
    fn pack_is_deterministic() {
        let set = sample_set();
        let tuning = TuningParams::new(0.05, 2.5, 2.0);
        let a = pack(&set, &tuning).unwrap();
        let b = pack(&set, &tuning).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn packed_fields_land_at_expected_offsets() {
        let set = sample_set();
        let tuning = TuningParams::new(0.1, 3.0, 0.0);
        let packed = pack(&set, &tuning).unwrap();
        let bytes = packed.as_bytes();

        let read_f32 = |offset: usize| {
            f32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };
        let read_u32 = |offset: usize| {
            u32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };

        assert_eq!(read_u32(0), 2);
        assert_eq!(read_f32(16), 0.25);
        assert_eq!(read_f32(20), 0.75);
        assert_eq!(read_f32(32), 1.0);
        assert_eq!(read_f32(48), 0.5);
        assert_eq!(read_f32(64), 0.0);
        assert_eq!(read_f32(76), 0.5);
        assert_eq!(read_f32(272), 0.1);
        assert_eq!(read_f32(276), 3.0);
        assert_eq!(read_f32(280), 0.0);
    }

    #[test]
    fn unused_slots_stay_zeroed() {
        let set = sample_set();
        let packed = pack(&set, &TuningParams::default()).unwrap();
        for slot in &packed.slots()[set.len()..] {
            assert_eq!(slot.position(), [0.0, 0.0]);
            assert_eq!(slot.color(), [0.0; 4]);
        }
    }

    #[test]
    fn empty_set_packs_to_zero_count() {
        let packed = pack(&SpotSet::new(Vec::new()), &TuningParams::default()).unwrap();
        assert_eq!(packed.spot_count(), 0);
        assert_eq!(packed.as_bytes().len(), 288);
    }

    #[test]
    fn oversized_set_is_rejected() {
        let spots = (0..MAX_SPOTS + 1)
            .map(|i| {
                Spot::new(
                    SpotPoint::new(i as f32 / 16.0, 0.5),
                    Rgba::opaque(1.0, 1.0, 1.0),
                )
            })
            .collect::<SpotSet>();
        let err = pack(&spots, &TuningParams::default()).unwrap_err();
        assert_eq!(
            err,
            GradientError::InvalidSpotCount {
                count: MAX_SPOTS + 1,
                max: MAX_SPOTS,
            }
        );
    }
}
