//! Memory policies that can be used for spaces.
//!
//! A space is a range of the heap whose objects are managed the same way. The young space
//! bump-allocates objects that are copied out at every collection. The tenured space keeps
//! objects in pools and frees them when they are swept.

pub mod space;

pub mod tenured_space;
pub mod young_space;
