// Application layer - Plot engine and collaborator traits
pub mod annotations;
pub mod archive_source;
pub mod errors;
pub mod live_source;
pub mod merger;
pub mod normalizer;
pub mod plot_buffer;
pub mod plot_data_source;
pub mod reconciler;
pub mod synchronizer;

#[cfg(test)]
pub mod testing;
