//! vaultsync - Encrypted sync of note vaults through one umbrella repository
//!
//! Each vault is its own git repository. Only its history is published,
//! packed into a password-protected archive at the umbrella root:
//! - Backup of every vault before anything destructive
//! - Reconciliation of local pre-pull work through a backup branch
//! - One shared secret, created once, encrypting every archive
//!
//! Storage: `.backup/`, `.pwd/7z_password` and `<vault>.7z` under the
//! umbrella root.

pub mod archive;
pub mod backup;
pub mod credentials;
pub mod discovery;
pub mod error;
pub mod gitignore;
pub mod policy;
pub mod report;
pub mod sync;
pub mod vcs;

pub use archive::{Archiver, SevenZip};
pub use backup::{BackupManager, BACKUP_BRANCH};
pub use credentials::CredentialStore;
pub use discovery::{list_vaults, Vault};
pub use error::SyncError;
pub use policy::{Classification, Step};
pub use report::SyncReport;
pub use sync::{init, Syncer};
pub use vcs::{GitCli, Vcs};
