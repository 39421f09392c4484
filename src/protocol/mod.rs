//! Naming rules shared by the registry, metadata restore and the admin
//! surface.

pub mod names;

pub use names::{
    backend_name, is_ephemeral, is_valid_channel_name, is_valid_topic_name, EPHEMERAL_SUFFIX,
    MAX_NAME_LENGTH,
};
