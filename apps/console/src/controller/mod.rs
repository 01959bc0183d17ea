//! Controller layer: parsed UI commands and their orchestration over the
//! edit-session controllers.

pub mod events;
pub mod orchestration;
