//! # Transit Gateway Fabric
//!
//! Attachments and route tables of a transit gateway, read from an external
//! source and normalized for reachability analysis.
//!
//! ## Architecture
//!
//! ```text
//! FabricSource (aws cli | JSON snapshot)
//!     │
//!     ├──> describe_attachments()
//!     │      └─> AttachmentCatalog (alias names, sorted by type + name)
//!     │
//!     └──> search_routes(rtb, [active, blackhole])
//!            └─> RouteIndex (memoized per route table)
//!                  ├─ routes_for(rtb)
//!                  └─ has_return_route(rtb, attachment)
//! ```

mod alias;
mod catalog;
mod error;
mod route_index;
mod source;
mod types;

pub use alias::AliasMap;
pub use catalog::{AttachmentCatalog, NamePolicy};
pub use error::{FabricError, Result};
pub use route_index::RouteIndex;
pub use source::{
    AwsCliConfig, AwsCliSource, FabricSource, SnapshotSource, ATTACHMENTS_FILE, ROUTE_TABLES_DIR,
};
pub use types::{
    Attachment, DescribeAttachmentsOutput, RawAssociation, RawAttachment, RawRoute,
    RawRouteAttachment, Route, RouteState, SearchRoutesOutput, Tag,
};
