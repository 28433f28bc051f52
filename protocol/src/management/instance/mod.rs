pub use descriptor::{DescriptorError, InstanceDescriptor, Manifest, Member};
pub use notification::InstanceNotification;
pub use status::InstanceState;

mod descriptor;
mod notification;
mod status;
