//! Image generation providers.

mod ark;

pub use ark::{ArkProvider, ArkProviderBuilder, GENERATIONS_URL};
