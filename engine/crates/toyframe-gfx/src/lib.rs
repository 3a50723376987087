pub mod barrier;
pub mod barrier_tracker;
pub mod command_recorder;
pub mod device;
pub mod handles;
pub mod resource_state;
pub mod resource_table;
pub mod sync;
pub mod vk_encoder;
