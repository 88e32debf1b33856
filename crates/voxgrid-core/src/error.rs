//! Error types for voxgrid-core operations

/// Result type for voxgrid-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in voxgrid-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Coordinate component outside the container bounds
    #[error("Coordinate {coord} out of range on axis {axis}: extent is {extent}")]
    CoordOutOfRange { axis: usize, coord: i64, extent: usize },

    /// Intra-cell index outside the backing array
    #[error("Index {index} out of range for backing array of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Cell index outside the container's cell list
    #[error("Cell {cell} out of range: container has {cells} cells")]
    CellOutOfRange { cell: usize, cells: usize },

    /// Bulk copy length disagreement
    #[error("Length mismatch: expected {expected}, got {actual}")]
    LenMismatch { expected: usize, actual: usize },

    /// Plane index outside the container's plane count
    #[error("Plane {plane} out of range: container has {planes} planes")]
    PlaneOutOfRange { plane: usize, planes: usize },

    /// Axis index outside the container's rank
    #[error("Axis {axis} out of range for rank {rank}")]
    AxisOutOfRange { axis: usize, rank: usize },

    /// Coordinate/container rank disagreement
    #[error("Rank mismatch: expected {expected} axes, got {got}")]
    RankMismatch { expected: usize, got: usize },

    /// Zero or missing axis extents
    #[error("Invalid dimensions {dims:?}: need at least one axis, every extent positive")]
    InvalidDimensions { dims: Vec<usize> },

    /// Entities-per-pixel of zero
    #[error("Entities per pixel must be at least 1")]
    InvalidEntitiesPerPixel,

    /// Malformed external plane stack
    #[error("Invalid plane stack: {0}")]
    InvalidStack(String),

    /// Operation on a closed container
    #[error("Container is closed")]
    Closed,

    /// Cursor advanced past the end of its traversal
    #[error("Cursor is exhausted")]
    Exhausted,

    /// Slot or sample access before the first advance
    #[error("Cursor is not positioned on an element")]
    Unpositioned,

    /// Read of a cached cell whose content never finished loading
    #[error("Cell {cell} content is not valid: load pending or failed")]
    NotLoaded { cell: usize },

    /// Cell loader failure on first-touch load
    #[error("Load of cell {cell} failed: {reason}")]
    Load { cell: usize, reason: String },

    /// Cell write-back failure during flush or eviction
    #[error("Store of cell {cell} failed: {reason}")]
    Store { cell: usize, reason: String },
}
