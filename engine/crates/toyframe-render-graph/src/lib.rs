pub mod frame_graph;
pub mod pass;
pub mod pipeline_provider;
pub mod texture_upload;
pub mod uniform;
