pub mod annotator;
pub mod background;
pub mod blob;
pub mod blob_detector;
pub mod frame;
pub mod morphology;
pub mod picker;
pub mod timeline;
pub mod verification;
