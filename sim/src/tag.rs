//! Collider tags stored in Rapier's `user_data`.
//!
//! Contact handling needs to know what touched what (ground against box, ground against
//! sphere) and picking needs the body id, so both are packed into the collider's `u128`
//! user data.
//!
//! # Bit layout
//! Least-significant bit is bit 0:
//!
//! - bits 0..=63   : owner id (`u64`; body id for bodies, chunk key for ground)
//! - bits 64..=71  : [`SurfaceKind`] tag (`u8`)
//! - bits 72..=127 : reserved, must be zero
//!
//! A collider created without a tag has user data 0, which decodes to no kind.

pub type ColliderTag = u128;

/// What a collider is, as far as contact materials are concerned.
///
/// The numeric values are part of the tag layout. Do not reorder.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Ground = 1,
    Box = 2,
    Sphere = 3,
}

/// Pack an owner id and a kind into a collider tag.
pub fn pack_tag(id: u64, kind: SurfaceKind) -> ColliderTag {
    (id as u128) | ((kind as u128) << u64::BITS)
}

/// Extract the [`SurfaceKind`] of a tag, or `None` for untagged/unknown colliders.
pub fn try_unpack_kind(tag: ColliderTag) -> Option<SurfaceKind> {
    const KIND_MASK: u128 = u8::MAX as u128;
    match ((tag >> u64::BITS) & KIND_MASK) as u8 {
        1 => Some(SurfaceKind::Ground),
        2 => Some(SurfaceKind::Box),
        3 => Some(SurfaceKind::Sphere),
        _ => None,
    }
}

/// Extract the owner id of a tag. Does not validate the kind.
pub fn unpack_id(tag: ColliderTag) -> u64 {
    (tag & u64::MAX as u128) as u64
}

/// Ground tags carry the chunk coordinate, both halves as `u32` bit patterns.
pub fn chunk_tag_id(cx: i32, cz: i32) -> u64 {
    ((cx as u32 as u64) << 32) | (cz as u32 as u64)
}
