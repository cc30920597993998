pub mod local;
pub mod provider;
pub mod release;

pub use local::LocalCsv;
pub use provider::PlayDataSource;
pub use release::NflverseRelease;
