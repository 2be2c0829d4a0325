pub mod asset;
pub mod endpoint;
pub mod profile;

pub use asset::{AssetRepository, NewAssetRecord};
pub use endpoint::EndpointRepository;
pub use profile::ProfileRepository;
