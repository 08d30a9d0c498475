use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

/// Weeks of a month, Sunday first. Cells outside the month are `None`.
pub fn month_grid(year: i32, month: u32) -> CoreResult<Vec<[Option<NaiveDate>; 7]>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| CoreError::ValidationError(format!("Invalid month: {}-{}", year, month)))?;

    let lead = first.weekday().num_days_from_sunday() as usize;
    let mut weeks = Vec::new();
    let mut week: [Option<NaiveDate>; 7] = [None; 7];
    let mut slot = lead;

    for day in first.iter_days().take_while(|d| d.month() == month) {
        week[slot] = Some(day);
        slot += 1;
        if slot == 7 {
            weeks.push(week);
            week = [None; 7];
            slot = 0;
        }
    }
    if slot > 0 {
        weeks.push(week);
    }
    Ok(weeks)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub pages: usize,
}

/// Slice out one zero-based page. Out-of-range pages clamp to the last one.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total = items.len();
    let pages = total.div_ceil(per_page).max(1);
    let page = page.min(pages - 1);
    let start = page * per_page;
    let end = (start + per_page).min(total);

    Page {
        items: items.get(start..end).map(<[T]>::to_vec).unwrap_or_default(),
        page,
        per_page,
        total,
        pages,
    }
}

// ============================================================================
// Overlay placement for cell detail popups
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    fn bottom(&self) -> f64 {
        self.y + self.height
    }

    fn right(&self) -> f64 {
        self.x + self.width
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

const OVERLAY_MARGIN: f64 = 8.0;

/// Position an overlay next to its anchor: centred below it, flipped above
/// when it would run past the viewport bottom, and clamped horizontally.
pub fn place_overlay(content: Size, anchor: Rect, viewport: Rect) -> Point {
    let centred = anchor.x + anchor.width / 2.0 - content.width / 2.0;
    let min_x = viewport.x + OVERLAY_MARGIN;
    let max_x = (viewport.right() - OVERLAY_MARGIN - content.width).max(min_x);
    let x = centred.clamp(min_x, max_x);

    let below = anchor.bottom() + OVERLAY_MARGIN;
    let above = anchor.y - OVERLAY_MARGIN - content.height;
    let y = if below + content.height <= viewport.bottom() || above < viewport.y {
        below
    } else {
        above
    };

    Point { x, y }
}
