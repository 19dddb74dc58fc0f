pub mod fit_result;
pub mod ids;
pub mod point;
pub mod point_set;
pub mod region;
pub mod vector;

pub use fit_result::*;
pub use ids::*;
pub use point::*;
pub use point_set::*;
pub use region::*;
pub use vector::*;

/// Magnitudes below this are treated as degenerate rather than divided by.
pub const DEGENERATE_EPS: f64 = 1e-10;
