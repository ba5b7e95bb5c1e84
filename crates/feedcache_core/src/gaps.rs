/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! "Load more" markers: known holes in a timeline between two status ids.

use crate::changes::Table;
use crate::db::{Reader, WriteCtx};
use crate::error::Result;
use feedcache_entities::Id;
use rusqlite::params;
use tracing::debug;

/// A hole in `timeline_id` between `after_status_id` (newer) and `before_status_id` (older).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LoadMore {
    pub timeline_id: String,
    pub after_status_id: Id,
    pub before_status_id: Id,
}

/// Which end of the gap a page was fetched from.
///
/// `Up` pages start right above `before_status_id`, `Down` pages start right below
/// `after_status_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GapFill {
    pub load_more: LoadMore,
    pub direction: Direction,
}

impl WriteCtx<'_> {
    pub(crate) fn insert_gap(&mut self, timeline_id: &str, after: &Id, before: &Id) -> Result<()> {
        if after <= before {
            debug!(timeline_id, %after, %before, "ignoring inverted gap");
            return Ok(());
        }
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO load_mores(timeline_id, after_status_id, before_status_id) VALUES (?1, ?2, ?3)",
            params![timeline_id, after.as_str(), before.as_str()],
        )?;
        self.touch_if(Table::LoadMores, changed);
        Ok(())
    }

    /// Retires the marker being filled and puts back whatever part of it the page
    /// did not reach.
    pub(crate) fn fill_gap(&mut self, fill: &GapFill, inserted: &[Id]) -> Result<()> {
        let lm = &fill.load_more;
        let changed = self.conn.execute(
            "DELETE FROM load_mores WHERE timeline_id=?1 AND after_status_id=?2 AND before_status_id=?3",
            params![
                lm.timeline_id,
                lm.after_status_id.as_str(),
                lm.before_status_id.as_str()
            ],
        )?;
        self.touch_if(Table::LoadMores, changed);

        match fill.direction {
            Direction::Up => {
                if let Some(max) = inserted.iter().max() {
                    if *max < lm.after_status_id {
                        self.insert_gap(&lm.timeline_id, &lm.after_status_id, max)?;
                    }
                }
            }
            Direction::Down => {
                if let Some(min) = inserted.iter().min() {
                    if *min > lm.before_status_id {
                        self.insert_gap(&lm.timeline_id, min, &lm.before_status_id)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl Reader<'_> {
    pub fn load_mores(&self, timeline_id: &str) -> Result<Vec<LoadMore>> {
        let mut stmt = self.conn.prepare(
            "SELECT after_status_id, before_status_id FROM load_mores WHERE timeline_id=?1",
        )?;
        let rows = stmt
            .query_map(params![timeline_id], |r| {
                Ok(LoadMore {
                    timeline_id: timeline_id.to_string(),
                    after_status_id: Id::from(r.get::<_, String>(0)?),
                    before_status_id: Id::from(r.get::<_, String>(1)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::PayloadCodec;
    use crate::db::CacheDb;
    use crate::mutation::Mutation;
    use crate::timeline::Timeline;

    fn ids(raw: &[&str]) -> Vec<Id> {
        raw.iter().map(|s| Id::from(*s)).collect()
    }

    fn db_with_gap() -> (CacheDb, LoadMore) {
        let db = CacheDb::open_in_memory(PayloadCodec::plain(), 16).unwrap();
        db.write(vec![Mutation::SaveTimeline(Timeline::Home)]).unwrap();
        let lm = LoadMore {
            timeline_id: "home".to_string(),
            after_status_id: Id::from("100"),
            before_status_id: Id::from("50"),
        };
        db.write(vec![Mutation::InsertGap(lm.clone())]).unwrap();
        (db, lm)
    }

    #[test]
    fn partial_down_fill_narrows_the_gap() {
        let (db, lm) = db_with_gap();
        db.write(vec![Mutation::FillGap {
            fill: GapFill {
                load_more: lm,
                direction: Direction::Down,
            },
            inserted: ids(&["99", "80", "70"]),
        }])
        .unwrap();
        let gaps = db.read(|r| r.load_mores("home")).unwrap();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].after_status_id, Id::from("70"));
        assert_eq!(gaps[0].before_status_id, Id::from("50"));
    }

    #[test]
    fn partial_up_fill_keeps_the_top_part() {
        let (db, lm) = db_with_gap();
        db.write(vec![Mutation::FillGap {
            fill: GapFill {
                load_more: lm,
                direction: Direction::Up,
            },
            inserted: ids(&["60", "51"]),
        }])
        .unwrap();
        let gaps = db.read(|r| r.load_mores("home")).unwrap();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].after_status_id, Id::from("100"));
        assert_eq!(gaps[0].before_status_id, Id::from("60"));
    }

    #[test]
    fn empty_page_closes_the_gap() {
        let (db, lm) = db_with_gap();
        db.write(vec![Mutation::FillGap {
            fill: GapFill {
                load_more: lm,
                direction: Direction::Down,
            },
            inserted: vec![],
        }])
        .unwrap();
        assert!(db.read(|r| r.load_mores("home")).unwrap().is_empty());
    }

    #[test]
    fn inverted_gaps_are_not_recorded() {
        let db = CacheDb::open_in_memory(PayloadCodec::plain(), 16).unwrap();
        db.write(vec![
            Mutation::SaveTimeline(Timeline::Home),
            Mutation::InsertGap(LoadMore {
                timeline_id: "home".to_string(),
                after_status_id: Id::from("5"),
                before_status_id: Id::from("9"),
            }),
        ])
        .unwrap();
        assert!(db.read(|r| r.load_mores("home")).unwrap().is_empty());
    }
}
