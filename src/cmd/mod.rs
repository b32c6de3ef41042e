//! CLI command implementations.
//!
//! | Module      | Commands handled |
//! |-------------|------------------|
//! | `translate` | `Translate`      |
//! | `check`     | `Check`          |
//! | `status`    | `Status`, `Plan` |
//! | `clean`     | `Clean`          |
//! | `init`      | `Init`           |
//! | `config`    | `Config`         |

pub mod check;
pub mod clean;
pub mod config;
pub mod init;
pub mod status;
pub mod translate;

pub use check::cmd_check;
pub use clean::cmd_clean;
pub use config::cmd_config;
pub use init::cmd_init;
pub use status::{cmd_plan, cmd_status};
pub use translate::cmd_translate;
