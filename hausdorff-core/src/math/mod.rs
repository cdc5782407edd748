mod rotation;
pub use self::rotation::*;
