//! Core data model and batch driver for the vegan recipes CSV runner.
//! Maps CSV headers onto the recipes search whitelist, normalizes cells into
//! typed arguments, and paces row-by-row call rendering while reporting
//! progress to an injected observer. Nothing here knows about MCP.

pub mod batch;
pub mod call;
pub mod cancel;
pub mod events;
pub mod headers;
pub mod normalize;
pub mod params;
pub mod table;

pub use batch::{
    BatchConfig, BatchDriver, BatchError, BatchReport, BatchStage, BatchSummary,
    DEFAULT_ROW_DELAY,
};
pub use call::{SyntheticCall, DEFAULT_CALL_NAME};
pub use cancel::CancelHandle;
pub use events::{BatchEvent, BatchObserver, NoopObserver, RecordingObserver};
pub use headers::{map_headers, ColumnMapping};
pub use normalize::{normalize, quote_literal, split_list, ArgValue, NormalizedArg};
pub use params::{ParamType, ParameterDescriptor, ParameterSet, RECIPES_SEARCH_PARAMS};
pub use table::{Cell, Table, TableError};
