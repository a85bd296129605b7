//! Weekly timetable: a grid of day × time slot → free-text cell.
//!
//! The grid is either [Timetable::builtin] or a replacement the user imported, stored next to the
//! attendance document (see [store]). Cells are turned into subjects by [extract].

pub mod csv;
pub mod extract;
pub mod store;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DAYS: [&str; 6] = [
    "MONDAY",
    "TUESDAY",
    "WEDNESDAY",
    "THURSDAY",
    "FRIDAY",
    "SATURDAY",
];

pub const TIME_SLOTS: [&str; 8] = [
    "09:00-10:00",
    "10:00-11:00",
    "11:00-12:00",
    "12:00-01:00",
    "01:00-02:00",
    "02:00-03:00",
    "03:00-04:00",
    "04:00-05:00",
];

/// Label of the daily break. Such cells never hold a class.
pub const LUNCH_BREAK: &str = "Lunch Break";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timetable {
    days: BTreeMap<String, BTreeMap<String, String>>,
}

impl Timetable {
    /// Every day and slot present, every cell empty.
    pub fn blank() -> Self {
        let days = DAYS
            .iter()
            .map(|day| {
                let slots = TIME_SLOTS
                    .iter()
                    .map(|slot| (slot.to_string(), String::new()))
                    .collect();
                (day.to_string(), slots)
            })
            .collect();
        Self { days }
    }

    /// The timetable bunkmeter ships with, used until the user imports their own.
    pub fn builtin() -> Self {
        const GRID: [[&str; 8]; 6] = [
            [
                "Minor",
                "24HS03TH0301-DM (DT203)",
                "24CS01TH0302-DAA (DT203)",
                LUNCH_BREAK,
                "24CS01TH0301-TOC (DT203)",
                "24CS01TH0304-CN (DT203)",
                "",
                "",
            ],
            [
                "Minor",
                "24CS01TH0304-CN (DT203)",
                "24CS01TH0301-TOC (DT203)",
                LUNCH_BREAK,
                "24CS01TH0302-DAA (DT203)",
                "",
                "",
                "",
            ],
            [
                "Minor",
                "",
                "",
                "24HS03TH0301-DM (DT203)",
                LUNCH_BREAK,
                "24CS01TH0302-DAA (DT203)",
                "24CS01PR0304-CN Lab (DT105) (B1&B3) / DAA Lab (DT111) (B2&B4)",
                "24CS01PR0304-CN Lab (DT105) (B1&B3) / DAA Lab (DT111) (B2&B4)",
            ],
            [
                "MDM",
                "",
                "24HS03TH0301-DM (DT203)",
                LUNCH_BREAK,
                "24CS01TH0301-TOC (DT304)",
                "24CS01PR0304-CN Lab (DT105) (B2&B4) / DAA Lab (DT111) (B1&B3)",
                "24CS01PR0304-CN Lab (DT105) (B2&B4) / DAA Lab (DT111) (B1&B3)",
                "",
            ],
            [
                "MDM",
                "24CS01PR0303-Software Lab (DT105) (B1&B3) / Software Lab (DT111) (B2&B4)",
                "24CS01PR0303-Software Lab (DT105) (B1&B3) / Software Lab (DT111) (B2&B4)",
                LUNCH_BREAK,
                "24CS01TH0304-CN (DT212)",
                "Technical Skill session (DT109)",
                "Technical Skill session (DT109)",
                "",
            ],
            [
                "MDM",
                "OE",
                "Mentor-Mentee Meeting Slot",
                // Lunch takes the first half hour of this slot
                "HONORS (DT301)",
                "HONORS (DT301)",
                "HONORS (DT301)",
                "HONORS (DT301)",
                "",
            ],
        ];

        let mut timetable = Self::blank();
        for (day, row) in DAYS.iter().zip(GRID) {
            for (slot, value) in TIME_SLOTS.iter().zip(row) {
                timetable.set_cell(day, slot, value);
            }
        }
        timetable
    }

    pub fn cell(&self, day: &str, slot: &str) -> Option<&str> {
        self.days
            .get(day)
            .and_then(|slots| slots.get(slot))
            .map(String::as_str)
    }

    pub fn set_cell(&mut self, day: &str, slot: &str, value: &str) {
        self.days
            .entry(day.to_string())
            .or_default()
            .insert(slot.to_string(), value.to_string());
    }

    pub fn has_day(&self, day: &str) -> bool {
        self.days.contains_key(day)
    }

    /// Cells of a single day in slot order. Unknown slots come after the fixed ones.
    pub fn day_cells<'a>(&'a self, day: &str) -> Vec<(&'a str, &'a str)> {
        let Some(slots) = self.days.get(day) else {
            return vec![];
        };
        let mut cells = slots
            .iter()
            .map(|(slot, value)| (slot.as_str(), value.as_str()))
            .collect::<Vec<_>>();
        cells.sort_by_key(|(slot, _)| (rank(&TIME_SLOTS, slot), *slot));
        cells
    }

    /// All cells in week order: days Monday to Saturday, slots in time order.
    pub fn cells(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        let mut days = self.days.keys().map(String::as_str).collect::<Vec<_>>();
        days.sort_by_key(|day| (rank(&DAYS, day), *day));
        days.into_iter().flat_map(move |day| {
            self.day_cells(day)
                .into_iter()
                .map(move |(slot, value)| (day, slot, value))
        })
    }

    /// Number of cells that hold something other than a break.
    pub fn occupied_cells(&self) -> usize {
        self.cells()
            .filter(|(_, _, value)| !value.trim().is_empty() && *value != LUNCH_BREAK)
            .count()
    }

    /// Fixed days with no entry at all.
    pub fn missing_days(&self) -> Vec<&'static str> {
        DAYS.iter()
            .copied()
            .filter(|day| self.days.get(*day).map_or(true, |slots| slots.is_empty()))
            .collect()
    }
}

fn rank(order: &[&str], value: &str) -> usize {
    order
        .iter()
        .position(|v| *v == value)
        .unwrap_or(order.len())
}
