use serde::{Deserialize, Serialize};

/// One display's region in virtual desktop coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScreenGeometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl ScreenGeometry {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, point: (i32, i32)) -> bool {
        point.0 >= self.x
            && point.0 < self.x + self.width
            && point.1 >= self.y
            && point.1 < self.y + self.height
    }

    pub fn origin(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayInfo {
    pub id: u32,
    pub geometry: ScreenGeometry,
    pub is_primary: bool,
}

/// Picks the display under `point`. Where displays overlap, the primary
/// display wins, otherwise the first match in enumeration order.
pub fn select_display_for_point(displays: &[DisplayInfo], point: (i32, i32)) -> Option<DisplayInfo> {
    let mut matches = displays
        .iter()
        .filter(|display| display.geometry.contains(point));
    let first = *matches.next()?;
    if first.is_primary {
        return Some(first);
    }
    Some(
        matches
            .find(|display| display.is_primary)
            .copied()
            .unwrap_or(first),
    )
}

pub fn global_to_local(point: (i32, i32), origin: (i32, i32)) -> (i32, i32) {
    (point.0 - origin.0, point.1 - origin.1)
}

/// Bounding rectangle of every display; the overlay spans this area.
pub fn virtual_desktop_bounds(displays: &[DisplayInfo]) -> Option<ScreenGeometry> {
    let mut iter = displays
        .iter()
        .map(|display| display.geometry)
        .filter(|geometry| !geometry.is_empty());
    let first = iter.next()?;
    let (mut left, mut top) = (first.x, first.y);
    let (mut right, mut bottom) = (first.x + first.width, first.y + first.height);
    for geometry in iter {
        left = left.min(geometry.x);
        top = top.min(geometry.y);
        right = right.max(geometry.x + geometry.width);
        bottom = bottom.max(geometry.y + geometry.height);
    }
    Some(ScreenGeometry::new(left, top, right - left, bottom - top))
}
