/// Database utilities
///
/// - `pool`: PostgreSQL connection pool management
/// - `migrations`: Schema migration runner

pub mod migrations;
pub mod pool;
