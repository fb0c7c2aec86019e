//! Inline calendar widget — renders a month grid for date selection.
//!
//! Pure functions only: every render is computed from (month, today), and
//! all navigation state lives in the button tokens themselves, so there is
//! no pagination cursor to go stale.

use chrono::{Datelike, NaiveDate};

use crate::gateway::{Button, Markup};

/// Token shared by every non-interactive cell.
pub const IGNORE: &str = "IGNORE";

const DAY_PREFIX: &str = "DAY-";
const PREV_PREFIX: &str = "PREV-";
const NEXT_PREFIX: &str = "NEXT-";

const WEEKDAYS: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// A (year, month) pair kept in the 1..=12 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    /// Normalize an arbitrary month offset into the calendar range:
    /// month 0 is December of the previous year, month 13 is January of
    /// the next.
    pub fn normalize(year: i32, month: i32) -> Self {
        let zero_based = month - 1;
        Self {
            year: year + zero_based.div_euclid(12),
            month: (zero_based.rem_euclid(12) + 1) as u32,
        }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn prev(self) -> Self {
        Self::normalize(self.year, self.month as i32 - 1)
    }

    pub fn next(self) -> Self {
        Self::normalize(self.year, self.month as i32 + 1)
    }

    fn first_day(self) -> NaiveDate {
        // month is normalized; only a year outside chrono's range can fail
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("year out of chrono range")
    }

    /// Number of days in the month.
    pub fn days(self) -> u32 {
        let next = self.next();
        next.first_day()
            .signed_duration_since(self.first_day())
            .num_days() as u32
    }

    fn label(self) -> String {
        format!("{} {}", MONTH_NAMES[(self.month - 1) as usize], self.year)
    }
}

impl std::fmt::Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// A parsed calendar button token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarAction {
    /// A selectable day was pressed.
    Day(NaiveDate),
    /// Navigate to another month.
    Goto(Month),
    /// Non-interactive cell.
    Ignore,
}

impl CalendarAction {
    /// Parse a token produced by [`build_calendar`]. Unrecognized tokens
    /// yield `None` and are ignored by the caller.
    pub fn parse(token: &str) -> Option<Self> {
        if token == IGNORE {
            return Some(Self::Ignore);
        }
        if let Some(rest) = token.strip_prefix(DAY_PREFIX) {
            return NaiveDate::parse_from_str(rest, "%Y-%m-%d")
                .ok()
                .map(Self::Day);
        }
        let rest = token
            .strip_prefix(PREV_PREFIX)
            .or_else(|| token.strip_prefix(NEXT_PREFIX))?;
        let (year, month) = rest.split_once('-')?;
        let year: i32 = year.parse().ok()?;
        let month: i32 = month.parse().ok()?;
        Some(Self::Goto(Month::normalize(year, month)))
    }
}

/// Build the inline-keyboard month grid for `month`.
///
/// Layout: month-year header row, weekday row, 1–6 week rows (Sunday
/// first), then a `<` / `>` navigation row. Days outside the month and
/// days strictly before `today` render as blank cells carrying the
/// [`IGNORE`] token — past days are suppressed entirely, not shown
/// grayed-out with their number.
pub fn build_calendar(month: Month, today: NaiveDate) -> Markup {
    let mut rows = Vec::new();

    rows.push(vec![Button::new(month.label(), IGNORE)]);
    rows.push(WEEKDAYS.iter().map(|d| Button::new(*d, IGNORE)).collect());

    let first = month.first_day();
    let lead = first.weekday().num_days_from_sunday() as usize;

    let mut cells: Vec<Button> = Vec::with_capacity(42);
    cells.resize_with(lead, blank_cell);
    for day in 1..=month.days() {
        // normalized month + in-range day cannot fail
        let date = NaiveDate::from_ymd_opt(month.year, month.month, day)
            .expect("day within month range");
        if date < today {
            cells.push(blank_cell());
        } else {
            cells.push(Button::new(
                day.to_string(),
                format!("{DAY_PREFIX}{}", date.format("%Y-%m-%d")),
            ));
        }
    }
    while cells.len() % 7 != 0 {
        cells.push(blank_cell());
    }

    let mut cells = cells.into_iter();
    while cells.len() > 0 {
        rows.push(cells.by_ref().take(7).collect());
    }

    rows.push(vec![
        Button::new("<", format!("{PREV_PREFIX}{}", month.prev())),
        Button::new(">", format!("{NEXT_PREFIX}{}", month.next())),
    ]);

    Markup::new(rows)
}

fn blank_cell() -> Button {
    Button::new(" ", IGNORE)
}
