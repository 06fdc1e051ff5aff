pub mod features;
pub mod rides;
pub mod split;

pub use features::*;
pub use rides::*;
pub use split::*;
