/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

/// Logical tables as seen by observers. A write reports the ones it touched and every
/// observation declares the ones it reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Table {
    Accounts,
    Statuses,
    Timelines,
    TimelineStatuses,
    LoadMores,
    ContextJoins,
    PinnedStatuses,
    AccountLists,
    FamiliarFollowers,
    Relationships,
    Toggles,
    Notifications,
    Conversations,
    Filters,
    FollowedTags,
    Emojis,
    EmojiUses,
    Instance,
    Rules,
    Announcements,
    LastRead,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TableSet(u32);

impl TableSet {
    pub const EMPTY: Self = Self(0);

    pub const fn of(tables: &[Table]) -> Self {
        let mut bits = 0u32;
        let mut i = 0;
        while i < tables.len() {
            bits |= 1 << (tables[i] as u8);
            i += 1;
        }
        Self(bits)
    }

    pub fn insert(&mut self, table: Table) {
        self.0 |= 1 << (table as u8);
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn contains(self, table: Table) -> bool {
        self.0 & (1 << (table as u8)) != 0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOrAssign for TableSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl From<Table> for TableSet {
    fn from(table: Table) -> Self {
        Self::of(&[table])
    }
}

/// Broadcast after every committed write.
#[derive(Clone, Debug)]
pub struct ChangeEvent {
    pub tables: TableSet,
}

impl ChangeEvent {
    pub fn new(tables: TableSet) -> Self {
        Self { tables }
    }
}
