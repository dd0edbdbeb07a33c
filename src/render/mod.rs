pub mod layout;
pub mod stencil;
pub mod svg;

pub use stencil::{DashState, Frame, Stencil, TextRole};
