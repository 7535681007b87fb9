pub mod ingestor;
pub use ingestor::{Ingestor, PersistTasks};

pub mod persist;
pub use persist::{PersistError, VideoPersister};

pub mod videos;
pub use videos::{PageLimits, QueryError, VideoPage, VideoQueryService};
