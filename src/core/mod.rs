pub mod engine;
pub mod module_writer;
pub mod pdl;
pub mod pipeline;

pub use crate::domain::model::{
    PdlSource, Protocol, ProtocolDocument, ProtocolSummary, SourceDocument,
};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
