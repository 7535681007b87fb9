mod ingest;
mod init;
mod serve;

pub use ingest::cmd_ingest;
pub use init::cmd_init;
pub use serve::cmd_serve;
