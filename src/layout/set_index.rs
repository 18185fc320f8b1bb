use std::fmt;

/// The role a descriptor set plays in a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SetRole {
    /// Camera and view matrices.
    PerView,
    /// The light being accumulated plus its shadow map.
    PerLight,
    /// Material uniforms and samplers of one model layer.
    PerModelLayer,
}

impl SetRole {
    pub const ALL: [Self; 3] = [Self::PerView, Self::PerLight, Self::PerModelLayer];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PerView => "PerView",
            Self::PerLight => "PerLight",
            Self::PerModelLayer => "PerModelLayer",
        }
    }
}

impl fmt::Display for SetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assigns descriptor-set indices to roles in allocation order.
///
/// A program owns one allocator, shared by both stages, so a role maps to the
/// same index in the vertex and fragment code. Allocating a role twice
/// returns the index it already has.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SetIndexAllocator {
    indices: [Option<u32>; 3],
    next: u32,
}

impl SetIndexAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, role: SetRole) -> u32 {
        let slot = &mut self.indices[role as usize];
        if let Some(index) = *slot {
            return index;
        }
        let index = self.next;
        *slot = Some(index);
        self.next += 1;
        index
    }

    #[inline]
    #[must_use]
    pub fn get(&self, role: SetRole) -> Option<u32> {
        self.indices[role as usize]
    }

    /// Number of sets allocated so far.
    #[inline]
    #[must_use]
    pub fn count(&self) -> u32 {
        self.next
    }

    /// Allocated `(role, index)` pairs ordered by index.
    #[must_use]
    pub fn assignments(&self) -> SetIndexes {
        let mut pairs: Vec<(SetRole, u32)> = SetRole::ALL
            .iter()
            .filter_map(|&role| self.get(role).map(|index| (role, index)))
            .collect();
        pairs.sort_by_key(|&(_, index)| index);
        SetIndexes { pairs }
    }
}

/// Frozen result of a [`SetIndexAllocator`], stored with compiled programs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SetIndexes {
    pairs: Vec<(SetRole, u32)>,
}

impl SetIndexes {
    #[must_use]
    pub fn get(&self, role: SetRole) -> Option<u32> {
        self.pairs
            .iter()
            .find(|(r, _)| *r == role)
            .map(|&(_, index)| index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SetRole, u32)> + '_ {
        self.pairs.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
