pub mod frame_counter;
pub mod frame_slots;
pub mod orchestrator;
pub mod present;
pub mod render_context;
pub mod settings;
pub mod shader_reload;
