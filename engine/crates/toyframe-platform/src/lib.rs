pub mod display_window;
pub mod input_event;
pub mod input_manager;
pub mod input_state;
