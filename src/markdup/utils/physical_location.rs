/**
 * A read's physical location on the flow cell. Lane, surface, swath, section and tile number
 * together name the tile the cluster was imaged in; x and y are the cluster coordinates
 * within that tile.
 *
 * The tile name is kept verbatim. `1203` means surface 1, swath 2, tile 3 and `12304` means
 * surface 1, swath 2, section 3, tile 4. Fields that the tile encoding does not carry are empty.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PhysicalLocation {
    pub(crate) lane: String,
    pub(crate) surface: String,
    pub(crate) swath: String,
    pub(crate) section: String,
    pub(crate) tile_name: String,
    pub(crate) tile_number: i32,
    pub(crate) x: i32,
    pub(crate) y: i32,
}

impl PhysicalLocation {
    /// True when both locations were imaged on the same tile of the same lane.
    pub(crate) fn same_tile(&self, other: &Self) -> bool {
        self.lane == other.lane && self.tile_name == other.tile_name
    }
}

/// Euclidean distance between the two clusters, truncated towards zero.
pub(crate) fn optical_distance(a: &PhysicalLocation, b: &PhysicalLocation) -> i32 {
    let dx = (a.x as i64 - b.x as i64) as f64;
    let dy = (a.y as i64 - b.y as i64) as f64;

    (dx * dx + dy * dy).sqrt() as i32
}
