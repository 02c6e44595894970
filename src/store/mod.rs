pub mod assets;

pub use assets::{AssetCache, AssetSource, AssetStore, InstallReport};
