pub mod config;
pub mod detail;
pub mod error;
pub mod profiles;
pub mod stats;
pub mod traits;
pub mod types;

pub use config::*;
pub use detail::*;
pub use error::*;
pub use profiles::*;
pub use traits::*;
pub use types::*;
