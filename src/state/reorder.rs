/// Reorder controller
///
/// Turns a resolved drag (source index, target index) into a new photo order.
/// The moved photo is lifted out and reinserted; everything between the two
/// indices shifts by one. Afterwards every `position` equals its index.

use super::data::Photo;

/// Anything carrying a persisted rank
pub trait Ranked {
    fn position(&self) -> u32;
    fn set_position(&mut self, position: u32);
}

impl Ranked for Photo {
    fn position(&self) -> u32 {
        self.position
    }

    fn set_position(&mut self, position: u32) {
        self.position = position;
    }
}

/// Move the item at `from` to `to` and rewrite every position densely
///
/// Out-of-range indices and `from == to` leave the sequence untouched.
pub fn reorder<T: Ranked>(mut items: Vec<T>, from: usize, to: usize) -> Vec<T> {
    if from == to || from >= items.len() || to >= items.len() {
        return items;
    }

    let moved = items.remove(from);
    items.insert(to, moved);
    renumber(&mut items);
    items
}

/// Set each item's position to its index
pub fn renumber<T: Ranked>(items: &mut [T]) {
    for (index, item) in items.iter_mut().enumerate() {
        item.set_position(index as u32);
    }
}

/// True when positions are exactly `0..len` in order
pub fn is_dense<T: Ranked>(items: &[T]) -> bool {
    items
        .iter()
        .enumerate()
        .all(|(index, item)| item.position() == index as u32)
}
