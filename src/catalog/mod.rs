//! Browsing state: loaded media assets and listed alignment tasks.
//!
//! * [`AssetCatalog`]: media the user can submit or play.
//! * [`AlignmentCatalog`]: a filtered page of existing alignment tasks.

pub mod alignments;
pub mod asset;

pub use alignments::{
    format_created, summary, AlignmentCatalog, AlignmentSelection, AlignmentSummary,
    TASK_MEDIA_TITLE,
};
pub use asset::{
    demo_assets, format_label, mime_for_url, Asset, AssetCatalog, CatalogError, MediaKind,
    DEFAULT_FORMAT, DEFAULT_TITLE,
};
