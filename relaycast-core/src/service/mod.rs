pub mod cleanup;
pub mod endpoint;
pub mod profile;
pub mod upload;

pub use cleanup::CleanupCoordinator;
pub use endpoint::{EndpointChange, EndpointDeletion, EndpointService};
pub use profile::{ProfileDeletion, ProfileService};
pub use upload::{
    UploadHandle, UploadProgress, UploadRequest, UploadSession, UploadState, UploadTicket,
};
