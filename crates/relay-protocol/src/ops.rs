//! Operation-specific types.

pub mod claim;
pub mod dispatch;

pub use claim::{ClaimRequest, ClaimResponse, PublishRequest, PublishResponse};
pub use dispatch::{DispatchRequest, DispatchResponse};

/// Known operation names.
pub mod names {
    pub const DISPATCH: &str = "dispatch";
    pub const CLAIM: &str = "claim";
    pub const PUBLISH: &str = "publish";
}
