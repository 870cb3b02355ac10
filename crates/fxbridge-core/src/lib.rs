//! Plugin introspection and parameter resolution for FxBridge.
//!
//! The host exposes effect parameters as bare numeric indices with no stable
//! identity, so controlling it from outside means rebuilding the missing
//! metadata layer on the fly: discover which plugins are installed,
//! instantiate each one in a disposable scratch context to read its
//! parameter schema, cache those schemas, and resolve loosely-spelled
//! parameter names back to the host's indices. All of that lives here,
//! behind [`CatalogService`] — a single gate that serializes every
//! host-touching operation and guarantees no scratch track or effect
//! instance outlives the request that created it.

mod catalog;
mod error;
mod metadata;
mod normalize;
mod resolve;
mod schema;
mod scratch;

pub use catalog::{
    CatalogReport, CatalogService, FxAdded, FxInfo, FxList, FxParamInfo, FxParamsReport,
    FxRemoved, FxToggled, ParamRead, ParamWrite, ProjectSaved, TrackInfo, TrackOverview,
};
pub use error::BridgeError;
pub use metadata::{classify_display, ParamMetadata};
pub use normalize::normalize;
pub use resolve::{build_param_table, resolve, ParamTable};
pub use schema::{describe_plugin, format_prefix, ParamDescriptor, PluginSchema};
pub use scratch::ScratchTrack;
