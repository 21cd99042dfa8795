pub mod card;
pub mod location;
pub mod window;

pub use card::CardInfo;
pub use location::{
    CaptureSource, Coordinates, CreateLocationRequest, CreateLocationResponse, LocationRecord,
    MessageResponse, PendingLocation,
};
pub use window::RecordingWindow;
