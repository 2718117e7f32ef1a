//! Command implementations for the portalsync CLI

mod init;
mod run;
mod status;
mod sync;
mod tenants;

pub use init::*;
pub use run::*;
pub use status::*;
pub use sync::*;
pub use tenants::*;
