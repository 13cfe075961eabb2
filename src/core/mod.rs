pub mod canvas_config;
pub mod linear_ticks;
pub mod palette;
pub mod ticks;
pub mod time_ticks;

pub use canvas_config::{CanvasConfig, DataPoint, DataRange, TILE_SIZE, ZOOM_FACTOR};
pub use linear_ticks::{LinearCandidates, LinearTickList, format_general, format_scientific};
pub use palette::{DEFAULT_PALETTE, Rgb, default_color};
pub use ticks::{
    BEST_DIST_PX, MIN_DIST_PX, TickCandidate, TickCoord, TickSpacing, TickSpec, TickUnit,
    select_best,
};
pub use time_ticks::{
    TIME_STEPS, TimeTickList, TimestampCandidates, format_timestamp, timestamp_to_datetime,
};
