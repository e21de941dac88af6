//! Identity for records owned by external collaborators.

/// A record with a stable identity across updates.
///
/// Line items keep their id while quantity and metadata change, so ledger
/// results and cart writes are keyed by [`Entity::id`]. Normalized quantities
/// and stock snapshots compare by value instead (see [`crate::ValueObject`]).
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    fn id(&self) -> &Self::Id;
}
