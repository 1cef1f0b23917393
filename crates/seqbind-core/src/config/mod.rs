//! Configuration system for seqbind.
//! TOML-based, layered resolution: env > project > defaults.

pub mod parser_config;
pub mod partition_config;
pub mod progress_config;
pub mod seqbind_config;
pub mod table_config;

pub use parser_config::ParserConfig;
pub use partition_config::PartitionConfig;
pub use progress_config::ProgressConfig;
pub use seqbind_config::SeqbindConfig;
pub use table_config::TableConfig;
