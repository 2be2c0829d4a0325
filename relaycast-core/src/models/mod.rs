pub mod asset;
pub mod endpoint;
pub mod id;
pub mod profile;

pub use asset::{MediaAsset, MediaKind};
pub use endpoint::{Endpoint, EndpointUpdate, NewEndpoint};
pub use id::{AssetId, EndpointId, ProfileId};
pub use profile::Profile;
