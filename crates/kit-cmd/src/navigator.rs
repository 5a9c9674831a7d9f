//! Selection cursor movement over a [`VisibleSet`].
//!
//! Every transition is a pure function of the current cursor position, the
//! visible set and the direction. Only selectable items (enabled, with a
//! non-empty value) are ever targeted.

use std::fmt;

use crate::filter::VisibleSet;

/// A direction the selection cursor can move in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// The first selectable item.
    First,
    /// The last selectable item.
    Last,
    /// The next selectable item.
    Next,
    /// The previous selectable item.
    Prev,
    /// The first selectable item of the next group.
    NextGroup,
    /// The first selectable item of the previous group.
    PrevGroup,
}

impl Direction {
    fn is_forward(self) -> bool {
        matches!(self, Self::First | Self::Next | Self::NextGroup)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::First => "first",
            Self::Last => "last",
            Self::Next => "next",
            Self::Prev => "prev",
            Self::NextGroup => "next-group",
            Self::PrevGroup => "prev-group",
        };
        f.write_str(name)
    }
}

/// Computes cursor transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Navigator {
    wrap: bool,
}

impl Navigator {
    /// Create a navigator. With `wrap`, next/prev wrap at either end instead
    /// of staying on the boundary item.
    pub fn new(wrap: bool) -> Self {
        Self { wrap }
    }

    /// Whether next/prev wrap around.
    pub fn wraps(&self) -> bool {
        self.wrap
    }

    /// Position of the item to select when moving from `current`.
    ///
    /// `current` is the position of the selected item in
    /// [`VisibleSet::items`], or `None` when nothing visible is selected.
    /// Returns `None` when there is nothing to select; a boundary that is
    /// not wrapped returns `current`.
    pub fn target(
        &self,
        visible: &VisibleSet,
        current: Option<usize>,
        direction: Direction,
    ) -> Option<usize> {
        match direction {
            Direction::First => self.first(visible),
            Direction::Last => self.last(visible),
            Direction::Next => self.step(visible, current, true),
            Direction::Prev => self.step(visible, current, false),
            Direction::NextGroup | Direction::PrevGroup => self.group_jump(visible, current, direction),
        }
    }

    /// Position of the first selectable item.
    pub fn first(&self, visible: &VisibleSet) -> Option<usize> {
        visible.items().iter().position(|item| item.is_selectable())
    }

    /// Position of the last selectable item.
    pub fn last(&self, visible: &VisibleSet) -> Option<usize> {
        visible.items().iter().rposition(|item| item.is_selectable())
    }

    fn step(&self, visible: &VisibleSet, current: Option<usize>, forward: bool) -> Option<usize> {
        let Some(current) = current.filter(|&position| position < visible.len()) else {
            // Nothing selected yet: enter the list from the matching end.
            return if forward { self.first(visible) } else { self.last(visible) };
        };

        let items = visible.items();
        let found = if forward {
            items[current + 1..]
                .iter()
                .position(|item| item.is_selectable())
                .map(|offset| current + 1 + offset)
        } else {
            items[..current].iter().rposition(|item| item.is_selectable())
        };

        match found {
            Some(position) => Some(position),
            None if self.wrap => {
                if forward {
                    self.first(visible)
                } else {
                    self.last(visible)
                }
            }
            None if items[current].is_selectable() => Some(current),
            None => {
                if forward {
                    self.last(visible)
                } else {
                    self.first(visible)
                }
            }
        }
    }

    fn group_jump(
        &self,
        visible: &VisibleSet,
        current: Option<usize>,
        direction: Direction,
    ) -> Option<usize> {
        let forward = direction.is_forward();
        let groups = visible.groups();
        // Ungrouped or unselected positions count as group index -1.
        let current_group = current
            .and_then(|position| visible.group_index_at(position))
            .map_or(-1, |index| index as isize);

        let candidates: Box<dyn Iterator<Item = usize>> = if forward {
            Box::new((current_group + 1) as usize..groups.len())
        } else if current_group > 0 {
            Box::new((0..current_group as usize).rev())
        } else {
            Box::new(std::iter::empty())
        };

        for index in candidates {
            let range = groups[index].range();
            let start = range.start;
            if let Some(offset) = visible.items()[range]
                .iter()
                .position(|item| item.is_selectable())
            {
                return Some(start + offset);
            }
        }

        // No group in that direction: behave like a single-item move.
        self.step(visible, current, forward)
    }
}
