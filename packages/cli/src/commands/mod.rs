pub mod apply;
pub mod diff;
pub mod init;
pub mod listen;
pub mod validate;

pub use apply::{apply_command, ApplyArgs};
pub use diff::{diff, DiffArgs};
pub use init::{init, InitArgs};
pub use listen::{listen, ListenArgs};
pub use validate::{validate, ValidateArgs};
