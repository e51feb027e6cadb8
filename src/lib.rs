pub mod anchor;
pub mod floor;
pub mod geometry;
pub mod io;
pub mod scene;
pub mod sim;
pub mod system;
pub mod tracking;
