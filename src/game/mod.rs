pub mod clock;
pub mod constants;
pub mod input;
pub mod state;
pub mod tiles;
pub mod world;
