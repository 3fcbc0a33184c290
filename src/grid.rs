use std::fmt;

pub use glam::Vec2;

/// Axis-aligned rectangle, origin at the top-left corner
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle of the given size centered on `center`
    pub fn centered(center: Vec2, width: f32, height: f32) -> Self {
        Self::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn translate(&self, by: Vec2) -> Rect {
        Rect::new(self.x + by.x, self.y + by.y, self.width, self.height)
    }

    /// Grow (or shrink, for negative `amount`) every edge by `amount`
    pub fn inflate(&self, amount: f32) -> Rect {
        Rect::new(
            self.x - amount,
            self.y - amount,
            self.width + 2.0 * amount,
            self.height + 2.0 * amount,
        )
    }

    /// Scale about the rectangle's center
    pub fn scale_about_center(&self, factor: f32) -> Rect {
        Rect::centered(self.center(), self.width * factor, self.height * factor)
    }

    /// Strict overlap test; rectangles that only touch do not intersect
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    pub fn lerp(&self, to: &Rect, t: f32) -> Rect {
        Rect::new(
            self.x + (to.x - self.x) * t,
            self.y + (to.y - self.y) * t,
            self.width + (to.width - self.width) * t,
            self.height + (to.height - self.height) * t,
        )
    }
}

/// Address of one cell in the unbounded tile grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    pub col: i32,
    pub row: i32,
}

impl CellAddress {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }
}

// Row-major: rows first, then columns
impl Ord for CellAddress {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.row, self.col).cmp(&(other.row, other.col))
    }
}

impl PartialOrd for CellAddress {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.col, self.row)
    }
}

/// Inclusive rectangular range of cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub min_col: i32,
    pub max_col: i32,
    pub min_row: i32,
    pub max_row: i32,
}

impl CellRange {
    pub fn contains(&self, address: CellAddress) -> bool {
        (self.min_col..=self.max_col).contains(&address.col)
            && (self.min_row..=self.max_row).contains(&address.row)
    }

    pub fn columns(&self) -> usize {
        (self.max_col as i64 - self.min_col as i64 + 1).max(0) as usize
    }

    pub fn rows(&self) -> usize {
        (self.max_row as i64 - self.min_row as i64 + 1).max(0) as usize
    }

    pub fn len(&self) -> usize {
        self.columns() * self.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Addresses in row-major order (outer rows, inner columns)
    pub fn iter(&self) -> impl Iterator<Item = CellAddress> {
        let (min_col, max_col) = (self.min_col, self.max_col);
        (self.min_row..=self.max_row)
            .flat_map(move |row| (min_col..=max_col).map(move |col| CellAddress::new(col, row)))
    }
}

/// Geometry of the uniform tile grid and its content mapping
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    /// Tile width in pixels
    pub tile_width: f32,
    /// Tile height in pixels
    pub tile_height: f32,
    /// Gap between neighbouring tiles in pixels
    pub gap: f32,
    /// Logical column count used by the image mapping
    pub columns: i32,
    /// Number of distinct images cycled through the grid
    pub item_count: u32,
    /// Directory prefix of image references
    pub image_dir: String,
}

impl Default for GridLayout {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            tile_width: DEFAULT_TILE_WIDTH,
            tile_height: DEFAULT_TILE_HEIGHT,
            gap: DEFAULT_GAP,
            columns: DEFAULT_COLUMNS,
            item_count: DEFAULT_ITEM_COUNT,
            image_dir: DEFAULT_IMAGE_DIR.to_string(),
        }
    }
}

impl GridLayout {
    pub fn pitch_x(&self) -> f32 {
        self.tile_width + self.gap
    }

    pub fn pitch_y(&self) -> f32 {
        self.tile_height + self.gap
    }

    /// 1-based image index shown by a cell; stable for the cell's lifetime
    pub fn image_index(&self, address: CellAddress) -> u32 {
        let linear = address.row as i64 * self.columns as i64 + address.col as i64;
        (linear.unsigned_abs() % self.item_count.max(1) as u64) as u32 + 1
    }

    /// Top-left corner of a cell's tile in world pixels
    pub fn tile_origin(&self, address: CellAddress) -> Vec2 {
        Vec2::new(
            address.col as f32 * self.pitch_x(),
            address.row as f32 * self.pitch_y(),
        )
    }

    pub fn tile_rect(&self, address: CellAddress) -> Rect {
        let origin = self.tile_origin(address);
        Rect::new(origin.x, origin.y, self.tile_width, self.tile_height)
    }

    /// Cell whose tile covers the world point, `None` when the point falls in a gap
    pub fn cell_at(&self, world: Vec2) -> Option<CellAddress> {
        let col = (world.x / self.pitch_x()).floor();
        let row = (world.y / self.pitch_y()).floor();
        let address = CellAddress::new(col as i32, row as i32);
        self.tile_rect(address).contains(world).then_some(address)
    }

    /// Reference string of an image, e.g. `public/12.jpg`
    pub fn image_source(&self, image_index: u32) -> String {
        format!("{}/{}.jpg", self.image_dir, image_index)
    }
}

/// Recover the image index from an image reference.
/// Looks for the first `/<digits>.jpg` segment; anything malformed yields 1.
pub fn parse_image_index(source: &str) -> u32 {
    let mut segments = source.split('/');
    segments.next();
    for segment in segments {
        let digits = segment.bytes().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 || !segment[digits..].starts_with(".jpg") {
            continue;
        }
        return match segment[..digits].parse::<u32>() {
            Ok(index) if index > 0 => index,
            _ => 1,
        };
    }
    1
}
