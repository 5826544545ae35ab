mod persistence;
mod run_state;

pub use persistence::{ExportDocument, ExportLoader, ExportMetadata, ExportWriter};
pub use run_state::RunState;
