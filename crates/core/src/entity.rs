//! Entity trait: records that keep their identity while their attributes change.

/// A catalog record addressed by a stable key.
///
/// A product keeps its `ProductId` through renames, repricing and stock
/// movements; stores key records by `Entity::id`.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
