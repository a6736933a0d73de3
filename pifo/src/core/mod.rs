//! Clock and cycle arithmetic shared by every simulated stage.

pub mod time;
