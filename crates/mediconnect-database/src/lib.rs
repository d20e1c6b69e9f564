//! # MediConnect数据库模块
//!
//! 负责患者、病例和医生数据的存储，提供PostgreSQL连接池、完整的CRUD操作，
//! 以及用于演示和测试的内存存储。

pub mod connection;
pub mod memory;
pub mod models;
pub mod queries;
pub mod store;

// 重新导出主要类型
pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use models::*;
pub use queries::DatabaseQueries;
pub use store::PgStore;
