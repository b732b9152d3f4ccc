#![allow(
    // module_name_repetitions is pure style preference (e.g. commit::CommitStrategy)
    clippy::module_name_repetitions
)]

//! # overlay-edit
//!
//! Interactively edit one file of a provisioning overlay.
//!
//! The file is copied to a private scratch file, the operator's editor is
//! run on that copy, and the result is written back only if the session
//! changed it. New files ending in `.ww` start from a built-in template.
//!
//! ## Modules
//!
//! - [`overlay`]: Overlay name and path resolution
//! - [`scratch`]: Scratch file provisioning and template seeding
//! - [`session`]: Editor invocation and change detection
//! - [`commit`]: Writing the result back to the overlay
//! - [`edit`]: The workflow tying it all together
//! - [`config`]: Layered defaults for command-line flags
//! - [`error`]: Error taxonomy

pub mod commit;
pub mod config;
pub mod edit;
pub mod error;
pub mod overlay;
pub mod scratch;
pub mod session;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::commit::CommitStrategy;
    pub use crate::edit::{edit_overlay_file, EditOptions, EditOutcome, EditRequest};
    pub use crate::error::{EditError, EditResult};
    pub use crate::overlay::OverlayRegistry;
    pub use crate::session::{ChangeDetection, Editor, EditorCommand};
}
