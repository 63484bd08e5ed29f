//! # robot-sockets
//!
//! Engine-agnostic placement core for modular robots built from rotatable parts.
//!
//! Parts and the socket regions they snap into are authored as short descriptor
//! strings (`Head_2x4_S2_LR_torso`, `Tail_1x2_S1_R_wing`). This crate parses them
//! into [`GridDescriptor`]s, rotates them in quarter turns, decides whether a socket
//! accepts a part through a level-and-exposure rule, and tracks cell occupancy for
//! every live socket, including the sockets that placed parts expose in turn.
//!
//! Rendering, physics and instantiation stay with the host engine: grids only map
//! cells to world positions through an explicit origin and orientation.

pub mod config;
pub mod descriptor;
pub mod grid;
pub mod hierarchy;
pub mod part;
pub mod rotation;
pub mod surrounding;

pub use config::*;
pub use descriptor::*;
pub use grid::*;
pub use hierarchy::*;
pub use part::*;
pub use rotation::*;
pub use surrounding::*;
